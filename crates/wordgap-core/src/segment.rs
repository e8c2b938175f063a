//! Splitting input text into synthesis units

use std::iter::FusedIterator;

use crate::error::{Error, Result};

/// Whitespace-split words of one input, grouped `chunk_size` at a time.
///
/// Iteration is lazy and can be restarted any number of times through
/// [`Segmenter::chunks`]. Word order is preserved and nothing is deduplicated.
#[derive(Debug, Clone)]
pub struct Segmenter<'a> {
    words: Vec<&'a str>,
    chunk_size: usize,
}

impl<'a> Segmenter<'a> {
    pub fn new(text: &'a str, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::ConfigError(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            words: text.split_whitespace().collect(),
            chunk_size,
        })
    }

    pub fn chunks(&self) -> Chunks<'_, 'a> {
        Chunks {
            inner: self.words.chunks(self.chunk_size),
        }
    }

    /// Number of chunks the iterator yields
    pub fn len(&self) -> usize {
        self.words.len().div_ceil(self.chunk_size)
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl<'s, 'a> IntoIterator for &'s Segmenter<'a> {
    type Item = String;
    type IntoIter = Chunks<'s, 'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks()
    }
}

/// Iterator over space-joined chunks
#[derive(Debug, Clone)]
pub struct Chunks<'s, 'a> {
    inner: std::slice::Chunks<'s, &'a str>,
}

impl Iterator for Chunks<'_, '_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.inner.next().map(|words| words.join(" "))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Chunks<'_, '_> {}

impl FusedIterator for Chunks<'_, '_> {}
