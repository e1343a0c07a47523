//! Image references and reference sets

use std::collections::HashSet;
use std::collections::hash_set;
use std::fmt;

/// A `(repository, tag)` pair. Two references are the same image iff both
/// fields match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageRef {
    repository: String,
    tag: String,
}

impl ImageRef {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Full engine reference on a given registry host, e.g. `host/repo:tag`
    pub fn qualified(&self, host: &str) -> String {
        format!("{}/{}:{}", host, self.repository, self.tag)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// Unordered set of image references with O(1) membership
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRefSet {
    images: HashSet<ImageRef>,
}

impl ImageRefSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the reference was already present
    pub fn insert(&mut self, image: ImageRef) -> bool {
        self.images.insert(image)
    }

    pub fn contains(&self, image: &ImageRef) -> bool {
        self.images.contains(image)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> hash_set::Iter<'_, ImageRef> {
        self.images.iter()
    }

    /// References in a stable order, for printing
    pub fn sorted(&self) -> Vec<ImageRef> {
        let mut images: Vec<ImageRef> = self.images.iter().cloned().collect();
        images.sort();
        images
    }
}

impl FromIterator<ImageRef> for ImageRefSet {
    fn from_iter<I: IntoIterator<Item = ImageRef>>(iter: I) -> Self {
        Self {
            images: iter.into_iter().collect(),
        }
    }
}

impl Extend<ImageRef> for ImageRefSet {
    fn extend<I: IntoIterator<Item = ImageRef>>(&mut self, iter: I) {
        self.images.extend(iter);
    }
}

impl IntoIterator for ImageRefSet {
    type Item = ImageRef;
    type IntoIter = hash_set::IntoIter<ImageRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.into_iter()
    }
}

impl<'a> IntoIterator for &'a ImageRefSet {
    type Item = &'a ImageRef;
    type IntoIter = hash_set::Iter<'a, ImageRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.iter()
    }
}
