//! # Emission Model
//!
//! Learns how the external letter classifier confuses letters, from
//! `(predicted, true)` pairs. A model is fixed to one [`EmissionMode`] for
//! its whole life, so the two conventions can never be mixed in one table.
//!
//! The model is a two-state machine: it accumulates counts until
//! [`EmissionModel::finalize`] freezes them into log-probabilities, after
//! which it only answers lookups.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alphabet::{ALPHABET_SIZE, Letter};
use crate::corpus::check_finite;
use crate::error::{Result, ScrawlError};

/// Which letter of a training pair is the table key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmissionMode {
    /// Key is the true letter; learns P(predicted | true).
    #[default]
    Direct,
    /// Key is the predicted letter; learns P(true | predicted) and is
    /// Bayes-flipped with the corpus priors at decode time.
    Inverse,
}

impl std::fmt::Display for EmissionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Inverse => write!(f, "inverse"),
        }
    }
}

impl std::str::FromStr for EmissionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "inverse" | "bayes" => Ok(Self::Inverse),
            other => Err(format!("unknown emission mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum EmissionState {
    Accumulating {
        counts: [[u64; ALPHABET_SIZE]; ALPHABET_SIZE],
    },
    Frozen {
        log_probs: [[f64; ALPHABET_SIZE]; ALPHABET_SIZE],
    },
}

/// Per-key smoothed distribution over the counterpart letter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionModel {
    mode: EmissionMode,
    state: EmissionState,
}

impl EmissionModel {
    /// Create an accumulating model with every `(key, counterpart)` count
    /// pre-seeded to 1.
    pub fn new(mode: EmissionMode) -> Self {
        Self {
            mode,
            state: EmissionState::Accumulating {
                counts: [[1; ALPHABET_SIZE]; ALPHABET_SIZE],
            },
        }
    }

    /// Build, feed and freeze a model from `(predicted, true)` pairs.
    ///
    /// The mode decides which side of each pair becomes the key.
    ///
    /// # Errors
    /// `ScrawlError::Configuration` when `pairs` is empty, and
    /// `ScrawlError::Validation` when a pair holds a symbol outside `a..=z`.
    ///
    /// # Examples
    /// ```
    /// use scrawl_core::{EmissionMode, EmissionModel};
    ///
    /// let model = EmissionModel::train(EmissionMode::Direct, [('o', 'a'), ('a', 'a')]).unwrap();
    /// assert!(model.probability('a', 'o').unwrap() > model.probability('a', 'z').unwrap());
    /// ```
    pub fn train<I>(mode: EmissionMode, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (char, char)>,
    {
        let mut model = Self::new(mode);
        let mut seen = 0usize;
        for (predicted, actual) in pairs {
            model.add_pair(predicted, actual)?;
            seen += 1;
        }
        if seen == 0 {
            return Err(ScrawlError::Configuration(
                "no labeled pairs to train the emission model".into(),
            ));
        }
        model.finalize()?;
        debug!(pairs = seen, mode = %mode, "learned emission probabilities");
        Ok(model)
    }

    pub fn mode(&self) -> EmissionMode {
        self.mode
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.state, EmissionState::Frozen { .. })
    }

    /// Record one observation of `counterpart` under `key`.
    ///
    /// # Errors
    /// `ScrawlError::State` once the model is frozen, and
    /// `ScrawlError::Validation` for symbols outside `a..=z`.
    pub fn add_observation(&mut self, key: char, counterpart: char) -> Result<()> {
        let EmissionState::Accumulating { counts } = &mut self.state else {
            return Err(ScrawlError::State(
                "cannot add observations to a finalized emission model".into(),
            ));
        };
        let key = Letter::parse(key, "emission key")?;
        let counterpart = Letter::parse(counterpart, "emission counterpart")?;
        counts[key.index()][counterpart.index()] += 1;
        Ok(())
    }

    /// Record a classifier output against its ground truth, keyed by mode.
    pub fn add_pair(&mut self, predicted: char, actual: char) -> Result<()> {
        match self.mode {
            EmissionMode::Direct => self.add_observation(actual, predicted),
            EmissionMode::Inverse => self.add_observation(predicted, actual),
        }
    }

    /// Convert counts into per-key log-probabilities and freeze the model.
    ///
    /// # Errors
    /// `ScrawlError::State` if the model is already frozen.
    pub fn finalize(&mut self) -> Result<()> {
        let EmissionState::Accumulating { counts } = &self.state else {
            return Err(ScrawlError::State(
                "emission model is already finalized".into(),
            ));
        };
        let counts = *counts;
        let log_probs = counts.map(|row| {
            let total = row.iter().sum::<u64>() as f64;
            row.map(|count| (count as f64 / total).ln())
        });
        self.state = EmissionState::Frozen { log_probs };
        Ok(())
    }

    /// ln P(`counterpart` | `key`) for characters.
    ///
    /// # Errors
    /// `ScrawlError::State` before [`EmissionModel::finalize`], and
    /// `ScrawlError::Validation` for symbols outside `a..=z`.
    pub fn probability(&self, key: char, counterpart: char) -> Result<f64> {
        let key = Letter::parse(key, "emission key")?;
        let counterpart = Letter::parse(counterpart, "emission counterpart")?;
        self.log_prob(key, counterpart)
    }

    /// ln P(`counterpart` | `key`).
    #[inline]
    pub fn log_prob(&self, key: Letter, counterpart: Letter) -> Result<f64> {
        match &self.state {
            EmissionState::Frozen { log_probs } => Ok(log_probs[key.index()][counterpart.index()]),
            EmissionState::Accumulating { .. } => Err(ScrawlError::State(
                "emission model must be finalized before lookups".into(),
            )),
        }
    }

    /// Check that the model is frozen and every entry is finite.
    pub fn validate(&self) -> Result<()> {
        for key in Letter::all() {
            for counterpart in Letter::all() {
                check_finite(self.log_prob(key, counterpart)?, || {
                    format!("emission P({counterpart} | {key})")
                })?;
            }
        }
        Ok(())
    }
}
