//! Configuration for extraction and for the bundled dump tool.
//!
//! [`ExtractOptions`] tunes the library. [`Cli`] is the command line of the
//! `image-metadata` binary; options can also come from environment
//! variables with the `IMAGE_METADATA_` prefix.
//!
//! # Example
//!
//! ```
//! use image_metadata::ExtractOptions;
//!
//! let options = ExtractOptions {
//!     decode_makernotes: false,
//!     ..ExtractOptions::default()
//! };
//! assert_eq!(options.max_ifd_depth, 32);
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

// =============================================================================
// Default Values
// =============================================================================

/// Default ceiling on nested IFD depth.
pub const DEFAULT_MAX_IFD_DEPTH: usize = 32;

/// Default number of undecodable entry format codes tolerated per IFD.
pub const DEFAULT_MAX_INVALID_FORMAT_CODES: usize = 5;

// =============================================================================
// Library Options
// =============================================================================

/// Knobs for a single extraction call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Deepest IFD nesting followed before a branch is abandoned. Cycle
    /// detection alone guarantees termination, not bounded depth.
    pub max_ifd_depth: usize,

    /// An IFD stops being read after this many entries with unknown
    /// format codes; such an IFD is almost certainly garbage.
    pub max_invalid_format_codes: usize,

    /// Decode vendor makernotes. When off, makernote tags are kept as raw
    /// bytes on the Exif SubIFD.
    pub decode_makernotes: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_ifd_depth: DEFAULT_MAX_IFD_DEPTH,
            max_invalid_format_codes: DEFAULT_MAX_INVALID_FORMAT_CODES,
            decode_makernotes: true,
        }
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// Output style of the dump tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per tag: `[Directory] 0xTTTT = value`
    Text,
    /// The whole metadata tree as JSON
    Json,
}

/// Dump the metadata of image files.
///
/// Prints every directory's raw tag values and any errors met while reading.
#[derive(Parser, Debug, Clone)]
#[command(name = "image-metadata")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Files to read.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, env = "IMAGE_METADATA_FORMAT")]
    pub format: OutputFormat,

    /// Deepest IFD nesting to follow.
    #[arg(long, default_value_t = DEFAULT_MAX_IFD_DEPTH, env = "IMAGE_METADATA_MAX_IFD_DEPTH")]
    pub max_ifd_depth: usize,

    /// Keep makernotes as raw bytes instead of decoding them.
    #[arg(long, default_value_t = false)]
    pub no_makernotes: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// Validate the arguments and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.files.is_empty() {
            return Err("At least one file is required".to_string());
        }

        if self.max_ifd_depth == 0 {
            return Err("max_ifd_depth must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Library options implied by the arguments.
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            max_ifd_depth: self.max_ifd_depth,
            decode_makernotes: !self.no_makernotes,
            ..ExtractOptions::default()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
