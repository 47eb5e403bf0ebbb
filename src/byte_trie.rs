//! Prefix lookup over byte sequences.
//!
//! Used to recognise file signatures and camera makernote headers. Lookups
//! return the value of the *last terminal node passed* while walking the
//! probe, so a short registered prefix still matches when a longer sibling
//! path diverges part way through.

use std::collections::HashMap;

use crate::error::ByteTrieError;

struct Node<V> {
    children: HashMap<u8, Node<V>>,
    value: Option<V>,
}

impl<V> Node<V> {
    fn new() -> Self {
        Self {
            children: HashMap::new(),
            value: None,
        }
    }
}

/// A trie keyed by bytes, with an optional default value.
pub struct ByteTrie<V> {
    root: Node<V>,
    default: Option<V>,
    max_depth: usize,
}

impl<V> Default for ByteTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ByteTrie<V> {
    pub fn new() -> Self {
        Self {
            root: Node::new(),
            default: None,
            max_depth: 0,
        }
    }

    /// Create a trie that answers `default` when nothing matches.
    pub fn with_default(default: V) -> Self {
        Self {
            default: Some(default),
            ..Self::new()
        }
    }

    pub fn set_default(&mut self, default: V) {
        self.default = Some(default);
    }

    /// Length of the longest path added so far.
    ///
    /// Callers probing a stream need at most this many leading bytes.
    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Store `value` at the end of a single path, replacing any value
    /// already stored there.
    pub fn insert(&mut self, value: V, path: &[u8]) -> Result<(), ByteTrieError> {
        if path.is_empty() {
            return Err(ByteTrieError::EmptyPath);
        }

        let mut node = &mut self.root;
        for b in path {
            node = node.children.entry(*b).or_insert_with(Node::new);
        }
        node.value = Some(value);
        self.max_depth = self.max_depth.max(path.len());
        Ok(())
    }

    /// Find the value registered for the longest matching prefix of
    /// `bytes`, or the default when no registered path is a prefix.
    pub fn find(&self, bytes: &[u8]) -> Option<&V> {
        let mut node = &self.root;
        let mut found = self.default.as_ref();
        for b in bytes {
            match node.children.get(b) {
                Some(child) => {
                    node = child;
                    if let Some(value) = node.value.as_ref() {
                        found = Some(value);
                    }
                }
                None => break,
            }
        }
        found
    }
}

impl<V: Clone> ByteTrie<V> {
    /// Store `value` at the end of each of `paths`.
    ///
    /// Every path is validated before any is inserted, so an empty path
    /// leaves the trie untouched.
    pub fn add_path(&mut self, value: V, paths: &[&[u8]]) -> Result<(), ByteTrieError> {
        if paths.is_empty() || paths.iter().any(|p| p.is_empty()) {
            return Err(ByteTrieError::EmptyPath);
        }
        for path in paths {
            self.insert(value.clone(), path)?;
        }
        Ok(())
    }
}
