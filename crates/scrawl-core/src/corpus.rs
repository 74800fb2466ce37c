//! # Corpus Statistics
//!
//! Learns the language side of the HMM from a plain-text corpus: how words
//! start, how letters follow each other, and how often each letter occurs.
//!
//! Every table is add-one smoothed over its full domain before it is
//! normalized, so no lookup can ever yield a zero probability.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::alphabet::{ALPHABET_SIZE, Letter};
use crate::error::{Result, ScrawlError};

/// Lowercases tokens and strips anything that is not a word character.
#[derive(Debug, Clone)]
pub struct TokenNormalizer {
    re_non_word: Regex,
}

impl TokenNormalizer {
    /// # Errors
    /// Returns `ScrawlError::RegexError` if the pattern fails to compile
    /// (should never happen).
    pub fn new() -> Result<Self> {
        Ok(Self {
            re_non_word: Regex::new(r"[\W_]+")?,
        })
    }

    /// # Examples
    /// ```
    /// use scrawl_core::TokenNormalizer;
    ///
    /// let normalizer = TokenNormalizer::new().unwrap();
    /// assert_eq!(normalizer.normalize("Don't!"), "dont");
    /// ```
    pub fn normalize(&self, token: &str) -> String {
        self.re_non_word.replace_all(token, "").to_lowercase()
    }
}

/// Raw counts gathered while scanning a corpus.
#[derive(Debug, Clone)]
struct CorpusCounts {
    first: [u64; ALPHABET_SIZE],
    bigram: [[u64; ALPHABET_SIZE]; ALPHABET_SIZE],
    marginal: [u64; ALPHABET_SIZE],
    words: u64,
    rejected: u64,
}

impl CorpusCounts {
    fn new() -> Self {
        Self {
            first: [0; ALPHABET_SIZE],
            bigram: [[0; ALPHABET_SIZE]; ALPHABET_SIZE],
            marginal: [0; ALPHABET_SIZE],
            words: 0,
            rejected: 0,
        }
    }

    fn add_token(&mut self, token: &str) {
        let letters: Option<Vec<Letter>> = token.chars().map(Letter::from_char).collect();
        let Some(letters) = letters else {
            warn!(token, "dropping corpus token with characters outside a-z");
            self.rejected += 1;
            return;
        };
        let Some(first) = letters.first() else {
            return;
        };

        self.first[first.index()] += 1;
        for pair in letters.windows(2) {
            self.bigram[pair[0].index()][pair[1].index()] += 1;
        }
        for letter in &letters {
            self.marginal[letter.index()] += 1;
        }
        self.words += 1;
    }
}

/// Smoothed log-probability distribution over a 26-entry domain.
fn smoothed_log_row(counts: [u64; ALPHABET_SIZE]) -> [f64; ALPHABET_SIZE] {
    let total = counts.iter().sum::<u64>() as f64 + ALPHABET_SIZE as f64;
    counts.map(|count| ((count + 1) as f64 / total).ln())
}

/// First-letter prior, bigram transitions and letter marginals, all in
/// natural-log space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusStatistics {
    first_letter: [f64; ALPHABET_SIZE],
    bigram: [[f64; ALPHABET_SIZE]; ALPHABET_SIZE],
    marginal: [f64; ALPHABET_SIZE],
}

impl CorpusStatistics {
    /// Train from whitespace-delimited lowercase text, one entry per line.
    ///
    /// Tokens containing anything outside `a..=z` are dropped with a warning.
    ///
    /// # Errors
    /// `ScrawlError::Configuration` if the corpus is empty or yields no
    /// valid token.
    ///
    /// # Examples
    /// ```
    /// use scrawl_core::{CorpusStatistics, Letter};
    ///
    /// let stats = CorpusStatistics::train_from_corpus(["ab ba"]).unwrap();
    /// let a = Letter::from_char('a').unwrap();
    /// let c = Letter::from_char('c').unwrap();
    /// assert!(stats.first_letter(a) > stats.first_letter(c));
    /// ```
    pub fn train_from_corpus<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::train(lines, None)
    }

    /// Like [`CorpusStatistics::train_from_corpus`], but each token is first
    /// lowercased and stripped of punctuation.
    pub fn train_normalized<I, S>(lines: I, normalizer: &TokenNormalizer) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::train(lines, Some(normalizer))
    }

    fn train<I, S>(lines: I, normalizer: Option<&TokenNormalizer>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut counts = CorpusCounts::new();
        let mut line_count = 0usize;

        for line in lines {
            line_count += 1;
            for token in line.as_ref().split_whitespace() {
                match normalizer {
                    Some(normalizer) => {
                        let cleaned = normalizer.normalize(token);
                        if !cleaned.is_empty() {
                            counts.add_token(&cleaned);
                        }
                    }
                    None => counts.add_token(token),
                }
            }
        }

        if line_count == 0 {
            return Err(ScrawlError::Configuration("corpus is empty".into()));
        }
        if counts.words == 0 {
            return Err(ScrawlError::Configuration(format!(
                "corpus of {} lines contains no valid a-z words ({} rejected)",
                line_count, counts.rejected
            )));
        }

        debug!(
            lines = line_count,
            words = counts.words,
            rejected = counts.rejected,
            "learned corpus statistics"
        );

        Ok(Self {
            first_letter: smoothed_log_row(counts.first),
            bigram: counts.bigram.map(smoothed_log_row),
            marginal: smoothed_log_row(counts.marginal),
        })
    }

    /// ln P(word starts with `letter`).
    #[inline]
    pub fn first_letter(&self, letter: Letter) -> f64 {
        self.first_letter[letter.index()]
    }

    /// ln P(`next` | `prev`).
    #[inline]
    pub fn bigram(&self, prev: Letter, next: Letter) -> f64 {
        self.bigram[prev.index()][next.index()]
    }

    /// ln P(`letter` occurs at any position).
    #[inline]
    pub fn marginal(&self, letter: Letter) -> f64 {
        self.marginal[letter.index()]
    }

    /// Check that every entry is finite.
    ///
    /// Freshly trained statistics always pass; this guards blobs restored
    /// from elsewhere.
    pub fn validate(&self) -> Result<()> {
        for letter in Letter::all() {
            check_finite(self.first_letter(letter), || {
                format!("first-letter prior for '{letter}'")
            })?;
            check_finite(self.marginal(letter), || {
                format!("letter marginal for '{letter}'")
            })?;
            for next in Letter::all() {
                check_finite(self.bigram(letter, next), || {
                    format!("bigram '{letter}{next}'")
                })?;
            }
        }
        Ok(())
    }
}

pub(crate) fn check_finite(value: f64, what: impl FnOnce() -> String) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ScrawlError::ModelInvariant(format!(
            "{} is {}",
            what(),
            value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l(c: char) -> Letter {
        Letter::from_char(c).unwrap()
    }

    fn exp_sum(row: impl Iterator<Item = f64>) -> f64 {
        row.map(f64::exp).sum()
    }

    #[test]
    fn test_first_letter_and_bigram_preferences() {
        let stats = CorpusStatistics::train_from_corpus(["ab ba"]).unwrap();

        for c in Letter::all().filter(|&c| c != l('a') && c != l('b')) {
            assert!(stats.first_letter(l('a')) > stats.first_letter(c));
        }
        for c in Letter::all().filter(|&c| c != l('b')) {
            assert!(stats.bigram(l('a'), l('b')) > stats.bigram(l('a'), c));
        }
    }

    #[test]
    fn test_smoothed_values() {
        let stats = CorpusStatistics::train_from_corpus(["ab ba"]).unwrap();

        // Two words, a and b start one each.
        assert!((stats.first_letter(l('a')) - (2.0f64 / 28.0).ln()).abs() < 1e-12);
        assert!((stats.first_letter(l('z')) - (1.0f64 / 28.0).ln()).abs() < 1e-12);
        // Row 'a' saw one transition.
        assert!((stats.bigram(l('a'), l('b')) - (2.0f64 / 27.0).ln()).abs() < 1e-12);
        // Four letters in total.
        assert!((stats.marginal(l('b')) - (3.0f64 / 30.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_tables_normalize() {
        let stats =
            CorpusStatistics::train_from_corpus(["the quick brown fox", "jumps over the lazy dog"])
                .unwrap();

        assert!((exp_sum(Letter::all().map(|c| stats.first_letter(c))) - 1.0).abs() < 1e-9);
        assert!((exp_sum(Letter::all().map(|c| stats.marginal(c))) - 1.0).abs() < 1e-9);
        for prev in Letter::all() {
            let row = exp_sum(Letter::all().map(|next| stats.bigram(prev, next)));
            assert!((row - 1.0).abs() < 1e-9, "row {prev} sums to {row}");
        }
        assert!(stats.validate().is_ok());
    }

    #[test]
    fn test_empty_corpus_is_configuration_error() {
        let lines: Vec<&str> = Vec::new();
        let err = CorpusStatistics::train_from_corpus(lines).unwrap_err();
        assert!(matches!(err, ScrawlError::Configuration(_)));
    }

    #[test]
    fn test_invalid_tokens_dropped() {
        let stats = CorpusStatistics::train_from_corpus(["Hello w0rld ok"]).unwrap();
        let only_ok = CorpusStatistics::train_from_corpus(["ok"]).unwrap();
        assert_eq!(stats, only_ok);
    }

    #[test]
    fn test_all_tokens_invalid_is_configuration_error() {
        let err = CorpusStatistics::train_from_corpus(["ABC 123", "   "]).unwrap_err();
        assert!(matches!(err, ScrawlError::Configuration(_)));
    }

    #[test]
    fn test_normalized_training_cleans_tokens() {
        let normalizer = TokenNormalizer::new().unwrap();
        let stats = CorpusStatistics::train_normalized(["Hello, World!"], &normalizer).unwrap();
        let clean = CorpusStatistics::train_from_corpus(["hello world"]).unwrap();
        assert_eq!(stats, clean);
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let mut stats = CorpusStatistics::train_from_corpus(["ab"]).unwrap();
        stats.bigram[0][1] = f64::NEG_INFINITY;
        let err = stats.validate().unwrap_err();
        assert!(matches!(err, ScrawlError::ModelInvariant(_)));
        assert!(err.to_string().contains("bigram 'ab'"));
    }

    #[test]
    fn test_decode_fails_on_non_finite_tables() {
        use crate::decoder::SequenceDecoder;
        use crate::emission::{EmissionMode, EmissionModel};

        let emission =
            EmissionModel::train(EmissionMode::Direct, ('a'..='z').map(|c| (c, c))).unwrap();

        let mut bad_prior = CorpusStatistics::train_from_corpus(["ab ba"]).unwrap();
        bad_prior.first_letter[0] = f64::NAN;
        let mut bad_bigram = bad_prior.clone();
        bad_bigram.first_letter[0] = (2.0f64 / 28.0).ln();
        bad_bigram.bigram[0][1] = f64::NEG_INFINITY;

        for (stats, word) in [(&bad_prior, "a"), (&bad_bigram, "ab")] {
            let decoder = SequenceDecoder::new(stats, &emission).unwrap();
            assert!(matches!(
                decoder.decode_str(word),
                Err(ScrawlError::ModelInvariant(_))
            ));
            // Only the affected word fails.
            assert_eq!(decoder.decode_str("").unwrap(), "");
        }
    }
}
