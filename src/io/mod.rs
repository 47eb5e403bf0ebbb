mod byte_order;
mod random_access;
mod sequential;

pub use byte_order::{
    read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le, ByteOrder,
};
pub use random_access::{ByteArrayReader, RandomAccessReader};
pub use sequential::{SequentialByteArrayReader, SequentialReader, StreamReader};
