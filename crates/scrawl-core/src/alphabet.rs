//! # Alphabet
//!
//! The fixed 26-letter state space shared by every table and by the decoder.
//! Letters are stored by index so tables can be plain arrays.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrawlError};

/// Number of symbols in the alphabet.
pub const ALPHABET_SIZE: usize = 26;

/// A lowercase ASCII letter, `a` = 0 through `z` = 25.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub struct Letter(u8);

impl Letter {
    /// Parse a character, rejecting anything outside `a..=z`.
    pub fn from_char(c: char) -> Option<Self> {
        if c.is_ascii_lowercase() {
            Some(Self(c as u8 - b'a'))
        } else {
            None
        }
    }

    /// Like [`Letter::from_char`], but reports where the bad symbol came from.
    pub fn parse(c: char, context: &str) -> Result<Self> {
        Self::from_char(c).ok_or_else(|| ScrawlError::invalid_symbol(c, context))
    }

    /// Get a letter from its alphabet index.
    pub fn from_index(idx: usize) -> Option<Self> {
        (idx < ALPHABET_SIZE).then(|| Self(idx as u8))
    }

    /// Alphabet index in `0..26`.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn as_char(self) -> char {
        (b'a' + self.0) as char
    }

    /// All 26 letters in alphabet order.
    pub fn all() -> impl Iterator<Item = Letter> {
        (0..ALPHABET_SIZE as u8).map(Letter)
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl TryFrom<char> for Letter {
    type Error = ScrawlError;

    fn try_from(c: char) -> Result<Self> {
        Self::parse(c, "letter")
    }
}

impl From<Letter> for char {
    fn from(letter: Letter) -> char {
        letter.as_char()
    }
}

/// The classifier's letter predictions for consecutive samples of one word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationSequence {
    letters: Vec<Letter>,
}

impl ObservationSequence {
    pub fn new(letters: Vec<Letter>) -> Self {
        Self { letters }
    }

    /// Build a sequence from a string of observed letters.
    ///
    /// # Examples
    /// ```
    /// use scrawl_core::ObservationSequence;
    ///
    /// let obs = ObservationSequence::from_str_checked("cat").unwrap();
    /// assert_eq!(obs.len(), 3);
    /// assert!(ObservationSequence::from_str_checked("c4t").is_err());
    /// ```
    pub fn from_str_checked(observed: &str) -> Result<Self> {
        observed
            .chars()
            .map(|c| Letter::parse(c, "observation sequence"))
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    pub fn from_chars(observed: &[char]) -> Result<Self> {
        observed
            .iter()
            .map(|&c| Letter::parse(c, "observation sequence"))
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    pub fn letters(&self) -> &[Letter] {
        &self.letters
    }
}

impl FromIterator<Letter> for ObservationSequence {
    fn from_iter<I: IntoIterator<Item = Letter>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
