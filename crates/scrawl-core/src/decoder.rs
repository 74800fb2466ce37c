//! # Viterbi Decoding
//!
//! Recovers the most likely true word behind a sequence of classifier
//! outputs. The hidden states are the 26 letters at every position; the
//! transition model comes from [`CorpusStatistics`] and the observation model
//! from a frozen [`EmissionModel`].
//!
//! Scores are log-probabilities throughout. Ties are broken towards the lowest
//! letter index so decoding is deterministic.

use rayon::prelude::*;

use crate::alphabet::{ALPHABET_SIZE, Letter, ObservationSequence};
use crate::corpus::{CorpusStatistics, check_finite};
use crate::emission::{EmissionMode, EmissionModel};
use crate::error::{Result, ScrawlError};

/// Best path score and backpointer for one lattice cell.
#[derive(Debug, Clone, Copy)]
struct PathState {
    score: f64,
    prev: Option<Letter>,
}

impl PathState {
    const UNREACHED: Self = Self {
        score: f64::NEG_INFINITY,
        prev: None,
    };
}

/// Lattice column per position, one cell per letter.
type Lattice = Vec<[PathState; ALPHABET_SIZE]>;

/// A decoded word together with the log-probability of its path.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedWord {
    pub word: String,
    pub log_prob: f64,
}

/// Viterbi decoder over a frozen pair of models.
///
/// The decoder only borrows the tables, so any number of decoders can share
/// one trained model across threads.
#[derive(Debug, Clone, Copy)]
pub struct SequenceDecoder<'m> {
    corpus: &'m CorpusStatistics,
    emission: &'m EmissionModel,
}

impl<'m> SequenceDecoder<'m> {
    /// # Errors
    /// `ScrawlError::State` if the emission model has not been finalized.
    pub fn new(corpus: &'m CorpusStatistics, emission: &'m EmissionModel) -> Result<Self> {
        if !emission.is_frozen() {
            return Err(ScrawlError::State(
                "cannot decode before the emission model is finalized".into(),
            ));
        }
        Ok(Self::from_frozen(corpus, emission))
    }

    /// Caller guarantees `emission` is frozen.
    pub(crate) fn from_frozen(corpus: &'m CorpusStatistics, emission: &'m EmissionModel) -> Self {
        Self { corpus, emission }
    }

    /// Decode a string of observed letters.
    ///
    /// # Examples
    /// ```
    /// use scrawl_core::{CorpusStatistics, EmissionMode, EmissionModel, SequenceDecoder};
    ///
    /// let corpus = CorpusStatistics::train_from_corpus(["cat cat cot"]).unwrap();
    /// let pairs = "abcdefghijklmnopqrstuvwxyz".chars().map(|c| (c, c));
    /// let emission = EmissionModel::train(EmissionMode::Direct, pairs).unwrap();
    /// let decoder = SequenceDecoder::new(&corpus, &emission).unwrap();
    /// assert_eq!(decoder.decode_str("cat").unwrap(), "cat");
    /// ```
    pub fn decode_str(&self, observed: &str) -> Result<String> {
        let observations = ObservationSequence::from_str_checked(observed)?;
        self.decode(&observations)
    }

    /// Most probable hidden word for `observations`.
    pub fn decode(&self, observations: &ObservationSequence) -> Result<String> {
        self.decode_scored(observations).map(|decoded| decoded.word)
    }

    /// Decode several independent words in parallel.
    ///
    /// Each word succeeds or fails on its own.
    pub fn decode_batch(&self, words: &[ObservationSequence]) -> Vec<Result<String>> {
        words.par_iter().map(|obs| self.decode(obs)).collect()
    }

    /// Most probable hidden word and its log-probability.
    ///
    /// # Errors
    /// `ScrawlError::ModelInvariant` if any table lookup is not finite.
    pub fn decode_scored(&self, observations: &ObservationSequence) -> Result<DecodedWord> {
        let observed = observations.letters();
        if observed.is_empty() {
            return Ok(DecodedWord {
                word: String::new(),
                log_prob: 0.0,
            });
        }

        let lattice = self.build_lattice(observed)?;
        let last = &lattice[observed.len() - 1];

        let mut best = PathState::UNREACHED.score;
        let mut best_letter = None;
        for letter in Letter::all() {
            let score = last[letter.index()].score;
            if score > best {
                best = score;
                best_letter = Some(letter);
            }
        }
        let best_letter = best_letter.ok_or_else(|| {
            ScrawlError::ModelInvariant("no reachable final letter in lattice".into())
        })?;

        let mut path = Vec::with_capacity(observed.len());
        let mut current = best_letter;
        path.push(current);
        for pos in (1..observed.len()).rev() {
            current = lattice[pos][current.index()].prev.ok_or_else(|| {
                ScrawlError::ModelInvariant(format!(
                    "missing backpointer at position {pos} for '{current}'"
                ))
            })?;
            path.push(current);
        }
        path.reverse();

        Ok(DecodedWord {
            word: path.into_iter().map(Letter::as_char).collect(),
            log_prob: best,
        })
    }

    fn build_lattice(&self, observed: &[Letter]) -> Result<Lattice> {
        let mut lattice: Lattice = Vec::with_capacity(observed.len());

        let mut first = [PathState::UNREACHED; ALPHABET_SIZE];
        for letter in Letter::all() {
            let prior = check_finite(self.corpus.first_letter(letter), || {
                format!("first-letter prior for '{letter}'")
            })?;
            let emit = self.emission_log_prob(letter, observed[0], 0)?;
            first[letter.index()].score = prior + emit;
        }
        lattice.push(first);

        for (pos, &obs) in observed.iter().enumerate().skip(1) {
            let prev_column = &lattice[pos - 1];
            let mut column = [PathState::UNREACHED; ALPHABET_SIZE];

            for curr in Letter::all() {
                let mut best = PathState::UNREACHED;
                for prev in Letter::all() {
                    let transition = check_finite(self.corpus.bigram(prev, curr), || {
                        format!("bigram '{prev}{curr}'")
                    })?;
                    let score = prev_column[prev.index()].score + transition;
                    if score > best.score {
                        best = PathState {
                            score,
                            prev: Some(prev),
                        };
                    }
                }
                best.score += self.emission_log_prob(curr, obs, pos)?;
                column[curr.index()] = best;
            }
            lattice.push(column);
        }

        Ok(lattice)
    }

    /// ln P(`observed` | `hidden`) under the model's emission mode.
    fn emission_log_prob(&self, hidden: Letter, observed: Letter, pos: usize) -> Result<f64> {
        let value = match self.emission.mode() {
            EmissionMode::Direct => self.emission.log_prob(hidden, observed)?,
            EmissionMode::Inverse => {
                let prior = if pos == 0 {
                    self.corpus.first_letter(hidden)
                } else {
                    self.corpus.marginal(hidden)
                };
                self.emission.log_prob(observed, hidden)? + prior - self.corpus.marginal(observed)
            }
        };
        check_finite(value, || {
            format!("emission for hidden '{hidden}' observed '{observed}' at position {pos}")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";

    fn identity_pairs(repeats: usize) -> Vec<(char, char)> {
        LETTERS
            .chars()
            .flat_map(|c| std::iter::repeat_n((c, c), repeats))
            .collect()
    }

    fn obs(s: &str) -> ObservationSequence {
        ObservationSequence::from_str_checked(s).unwrap()
    }

    #[test]
    fn test_decode_empty() {
        let corpus = CorpusStatistics::train_from_corpus(["cat"]).unwrap();
        let emission = EmissionModel::train(EmissionMode::Direct, identity_pairs(1)).unwrap();
        let decoder = SequenceDecoder::new(&corpus, &emission).unwrap();

        let decoded = decoder.decode_scored(&obs("")).unwrap();
        assert!(decoded.word.is_empty());
        assert_eq!(decoded.log_prob, 0.0);
    }

    #[test]
    fn test_decode_cat() {
        let corpus = CorpusStatistics::train_from_corpus(["cat cat cat", "cat sat"]).unwrap();
        let emission = EmissionModel::train(EmissionMode::Direct, identity_pairs(50)).unwrap();
        let decoder = SequenceDecoder::new(&corpus, &emission).unwrap();

        let observed = ObservationSequence::from_chars(&['c', 'a', 't']).unwrap();
        assert_eq!(decoder.decode(&observed).unwrap(), "cat");
    }

    #[test]
    fn test_language_model_fixes_misread() {
        // The classifier reads 'a' as 'o' half the time.
        let mut pairs = identity_pairs(20);
        pairs.extend(std::iter::repeat_n(('o', 'a'), 20));
        let corpus = CorpusStatistics::train_from_corpus(["cat cat cat cat cat"]).unwrap();
        let emission = EmissionModel::train(EmissionMode::Direct, pairs).unwrap();
        let decoder = SequenceDecoder::new(&corpus, &emission).unwrap();

        assert_eq!(decoder.decode_str("cot").unwrap(), "cat");
    }

    #[test]
    fn test_single_letter_is_argmax_of_first_column() {
        let corpus = CorpusStatistics::train_from_corpus(["to be or not to be"]).unwrap();
        let emission = EmissionModel::train(
            EmissionMode::Direct,
            [('o', 'o'), ('o', 'b'), ('t', 't'), ('e', 'o')],
        )
        .unwrap();
        let decoder = SequenceDecoder::new(&corpus, &emission).unwrap();
        let observed = Letter::from_char('o').unwrap();

        let mut expected = Letter::from_char('a').unwrap();
        let mut best = f64::NEG_INFINITY;
        for k in Letter::all() {
            let score = corpus.first_letter(k) + emission.log_prob(k, observed).unwrap();
            if score > best {
                best = score;
                expected = k;
            }
        }

        let decoded = decoder.decode_scored(&obs("o")).unwrap();
        assert_eq!(decoded.word, expected.to_string());
        assert!((decoded.log_prob - best).abs() < 1e-12);
    }

    #[test]
    fn test_ties_pick_lowest_letter() {
        // Every bigram once: uniform prior and uniform transition rows.
        let line: String = LETTERS
            .chars()
            .flat_map(|a| LETTERS.chars().map(move |b| format!("{a}{b} ")))
            .collect();
        let corpus = CorpusStatistics::train_from_corpus([line]).unwrap();
        // Only key 'a' deviates from uniform, making it slightly worse for 'q'.
        let emission = EmissionModel::train(EmissionMode::Direct, [('a', 'a')]).unwrap();
        let decoder = SequenceDecoder::new(&corpus, &emission).unwrap();

        // All scores are negative; a zero-initialized accumulator would stay
        // on 'a'. Among the tied letters the lowest index must win.
        assert_eq!(decoder.decode_str("q").unwrap(), "b");
        assert_eq!(decoder.decode_str("qqq").unwrap(), "bbb");
    }

    #[test]
    fn test_decode_is_deterministic() {
        let corpus =
            CorpusStatistics::train_from_corpus(["the rain in spain stays mainly in the plain"])
                .unwrap();
        let mut pairs = identity_pairs(5);
        pairs.extend([('n', 'm'), ('m', 'n'), ('l', 'i'), ('i', 'l')]);
        let emission = EmissionModel::train(EmissionMode::Direct, pairs).unwrap();
        let decoder = SequenceDecoder::new(&corpus, &emission).unwrap();

        let first = decoder.decode_scored(&obs("plaim")).unwrap();
        let second = decoder.decode_scored(&obs("plaim")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_inverse_mode_decodes() {
        let corpus = CorpusStatistics::train_from_corpus(["dog dog dig dug"]).unwrap();
        let emission = EmissionModel::train(EmissionMode::Inverse, identity_pairs(200)).unwrap();
        let decoder = SequenceDecoder::new(&corpus, &emission).unwrap();

        let decoded = decoder.decode_scored(&obs("dog")).unwrap();
        assert_eq!(decoded.word, "dog");
        assert!(decoded.log_prob.is_finite());
    }

    #[test]
    fn test_unfinalized_emission_is_state_error() {
        let corpus = CorpusStatistics::train_from_corpus(["cat"]).unwrap();
        let emission = EmissionModel::new(EmissionMode::Direct);
        let err = SequenceDecoder::new(&corpus, &emission).unwrap_err();
        assert!(matches!(err, ScrawlError::State(_)));
    }

    #[test]
    fn test_invalid_observation_is_validation_error() {
        let corpus = CorpusStatistics::train_from_corpus(["cat"]).unwrap();
        let emission = EmissionModel::train(EmissionMode::Direct, identity_pairs(1)).unwrap();
        let decoder = SequenceDecoder::new(&corpus, &emission).unwrap();
        assert!(matches!(
            decoder.decode_str("ca7"),
            Err(ScrawlError::Validation { symbol: '7', .. })
        ));
    }

    #[test]
    fn test_decode_batch_matches_sequential() {
        let corpus = CorpusStatistics::train_from_corpus(["hello world help held"]).unwrap();
        let emission = EmissionModel::train(EmissionMode::Direct, identity_pairs(30)).unwrap();
        let decoder = SequenceDecoder::new(&corpus, &emission).unwrap();

        let words: Vec<_> = ["hello", "", "held", "world"].into_iter().map(obs).collect();
        let batch = decoder.decode_batch(&words);
        assert_eq!(batch.len(), words.len());
        for (word, decoded) in words.iter().zip(batch) {
            assert_eq!(decoded.unwrap(), decoder.decode(word).unwrap());
        }
    }
}
