//! The extraction result model.
//!
//! A [`Metadata`] is an ordered list of [`Directory`] values. Decoders build
//! directories and hand them over; problems found while decoding are
//! recorded on the directory they concern instead of aborting the whole
//! extraction.

mod date;
mod directory;
mod kind;
mod value;

use serde::Serialize;

pub use date::parse_date;
pub use directory::{Directory, Tag};
pub use kind::{DirectoryKind, MakernoteVendor};
pub use value::{KeyValuePair, StringValue, TagValue};

/// All directories extracted from one file, in discovery order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Metadata {
    directories: Vec<Directory>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a directory and return its position.
    pub fn add_directory(&mut self, directory: Directory) -> usize {
        self.directories.push(directory);
        self.directories.len() - 1
    }

    pub fn directories(&self) -> &[Directory] {
        &self.directories
    }

    pub fn directory(&self, index: usize) -> Option<&Directory> {
        self.directories.get(index)
    }

    pub fn directory_mut(&mut self, index: usize) -> Option<&mut Directory> {
        self.directories.get_mut(index)
    }

    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }

    /// First directory of the given kind.
    pub fn first(&self, kind: &DirectoryKind) -> Option<&Directory> {
        self.directories.iter().find(|d| d.kind() == kind)
    }

    pub fn first_mut(&mut self, kind: &DirectoryKind) -> Option<&mut Directory> {
        self.directories.iter_mut().find(|d| d.kind() == kind)
    }

    /// Every directory of the given kind, in insertion order.
    pub fn all<'a>(&'a self, kind: &'a DirectoryKind) -> impl Iterator<Item = &'a Directory> + 'a {
        self.directories.iter().filter(move |d| d.kind() == kind)
    }

    /// Index of the first directory of `kind`, creating an empty one at the
    /// end when there is none yet.
    pub fn first_or_insert(&mut self, kind: DirectoryKind) -> usize {
        match self.directories.iter().position(|d| *d.kind() == kind) {
            Some(i) => i,
            None => self.add_directory(Directory::new(kind)),
        }
    }

    /// `true` when any directory recorded an error.
    pub fn has_errors(&self) -> bool {
        self.directories.iter().any(Directory::has_errors)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Directory> {
        self.directories.iter()
    }
}

impl<'a> IntoIterator for &'a Metadata {
    type Item = &'a Directory;
    type IntoIter = std::slice::Iter<'a, Directory>;

    fn into_iter(self) -> Self::IntoIter {
        self.directories.iter()
    }
}

impl IntoIterator for Metadata {
    type Item = Directory;
    type IntoIter = std::vec::IntoIter<Directory>;

    fn into_iter(self) -> Self::IntoIter {
        self.directories.into_iter()
    }
}
