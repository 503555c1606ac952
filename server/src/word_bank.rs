//! Word catalog the match sequences are sampled from

use crate::error::WordBankError;
use log::info;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::path::Path;

const BUILTIN_WORDS: &str = include_str!("words.txt");

/// An immutable, deduplicated set of candidate words
#[derive(Debug, Clone)]
pub struct WordBank {
    words: Vec<String>,
}

impl WordBank {
    /// Builds a bank from arbitrary words. Blank entries are skipped and
    /// duplicates collapse onto their first occurrence.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_string())
            .filter(|w| !w.is_empty())
            .filter(|w| seen.insert(w.clone()))
            .collect();

        Self { words }
    }

    pub fn builtin() -> Self {
        Self::parse_catalog(BUILTIN_WORDS)
    }

    /// Loads one word per line. Blank lines and `#` comments are skipped.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WordBankError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let bank = Self::parse_catalog(&contents);
        if bank.is_empty() {
            return Err(WordBankError::Empty);
        }

        info!(
            "Loaded {} words from {}",
            bank.len(),
            path.as_ref().display()
        );
        Ok(bank)
    }

    fn parse_catalog(contents: &str) -> Self {
        Self::new(
            contents
                .lines()
                .filter(|line| !line.trim_start().starts_with('#')),
        )
    }

    /// Samples `count` distinct words in random order
    pub fn draw<R: Rng + ?Sized>(
        &self,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<String>, WordBankError> {
        if count > self.words.len() {
            return Err(WordBankError::NotEnoughWords {
                requested: count,
                available: self.words.len(),
            });
        }

        let mut pool = self.words.clone();
        let (chosen, _) = pool.partial_shuffle(rng, count);
        Ok(chosen.to_vec())
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
