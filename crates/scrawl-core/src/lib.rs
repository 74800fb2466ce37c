//! # Scrawl Core
//!
//! Recovers handwritten words from a noisy per-letter classifier. A letter
//! bigram model learned from a text corpus and a confusion model learned from
//! the classifier's mistakes form a 26-state Hidden Markov Model, which is
//! decoded with the Viterbi algorithm.
//!
//! ## Quick Start
//!
//! ```rust
//! use scrawl_core::{TrainedModel, TrainingConfig};
//!
//! // The classifier reads 'a' as 'o' about half of the time.
//! let mut pairs: Vec<(char, char)> = ('a'..='z').map(|c| (c, c)).collect();
//! pairs.push(('o', 'a'));
//!
//! let model = TrainedModel::train(&TrainingConfig::new(), ["cat cat cat sat"], pairs).unwrap();
//! assert_eq!(model.decode_str("cot").unwrap(), "cat");
//! ```
pub mod alphabet;
pub mod corpus;
pub mod decoder;
pub mod emission;
pub mod error;
pub mod model;
pub mod recognizer;

// Re-export primary API
pub use alphabet::{ALPHABET_SIZE, Letter, ObservationSequence};
pub use corpus::{CorpusStatistics, TokenNormalizer};
pub use decoder::{DecodedWord, SequenceDecoder};
pub use emission::{EmissionMode, EmissionModel};
pub use error::{Result, ScrawlError};
pub use model::{MODEL_FORMAT_VERSION, ModelSlot, TrainedModel, TrainingConfig};
pub use recognizer::{AccuracyTally, LetterClassifier, Recognition, WordRecognizer};
