//! # Trained Model
//!
//! Bundles the corpus statistics and the frozen emission model produced by
//! one training run, and handles their opaque serialized form.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::corpus::{CorpusStatistics, TokenNormalizer};
use crate::decoder::SequenceDecoder;
use crate::emission::{EmissionMode, EmissionModel};
use crate::error::{Result, ScrawlError};

/// Version tag written into every model blob.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Configuration for a training run.
#[derive(Debug, Clone, Default)]
pub struct TrainingConfig {
    /// Which side of a labeled pair keys the emission table.
    pub mode: EmissionMode,
    /// Lowercase and strip punctuation from corpus tokens before use.
    pub normalize_corpus: bool,
}

impl TrainingConfig {
    /// Create a new training configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the emission mode.
    pub fn with_mode(mut self, mode: EmissionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable or disable corpus token normalization.
    pub fn with_normalized_corpus(mut self, enabled: bool) -> Self {
        self.normalize_corpus = enabled;
        self
    }
}

#[derive(Serialize)]
struct ModelBlobRef<'a> {
    version: u32,
    corpus: &'a CorpusStatistics,
    emission: &'a EmissionModel,
}

#[derive(Deserialize)]
struct ModelBlob {
    version: u32,
    corpus: CorpusStatistics,
    emission: EmissionModel,
}

/// Frozen language and emission tables from one training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    corpus: CorpusStatistics,
    emission: EmissionModel,
}

impl TrainedModel {
    /// Pair already-trained tables.
    ///
    /// # Errors
    /// `ScrawlError::State` if the emission model is still accumulating.
    pub fn new(corpus: CorpusStatistics, emission: EmissionModel) -> Result<Self> {
        if !emission.is_frozen() {
            return Err(ScrawlError::State(
                "emission model must be finalized before it can be published".into(),
            ));
        }
        Ok(Self { corpus, emission })
    }

    /// Run a full training pass.
    ///
    /// Nothing is returned unless both tables train successfully.
    pub fn train<L, S, P>(config: &TrainingConfig, corpus_lines: L, pairs: P) -> Result<Self>
    where
        L: IntoIterator<Item = S>,
        S: AsRef<str>,
        P: IntoIterator<Item = (char, char)>,
    {
        let corpus = if config.normalize_corpus {
            let normalizer = TokenNormalizer::new()?;
            CorpusStatistics::train_normalized(corpus_lines, &normalizer)?
        } else {
            CorpusStatistics::train_from_corpus(corpus_lines)?
        };
        info!("Learned transition probabilities");

        let emission = EmissionModel::train(config.mode, pairs)?;
        info!(mode = %config.mode, "Learned emission probabilities");

        Self::new(corpus, emission)
    }

    pub fn corpus(&self) -> &CorpusStatistics {
        &self.corpus
    }

    pub fn emission(&self) -> &EmissionModel {
        &self.emission
    }

    pub fn mode(&self) -> EmissionMode {
        self.emission.mode()
    }

    /// A decoder borrowing this model's tables.
    pub fn decoder(&self) -> SequenceDecoder<'_> {
        SequenceDecoder::from_frozen(&self.corpus, &self.emission)
    }

    /// Decode one string of observed letters.
    pub fn decode_str(&self, observed: &str) -> Result<String> {
        self.decoder().decode_str(observed)
    }

    /// Serialize to an opaque blob that reloads bit-identical.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let blob = ModelBlobRef {
            version: MODEL_FORMAT_VERSION,
            corpus: &self.corpus,
            emission: &self.emission,
        };
        Ok(serde_json::to_vec(&blob)?)
    }

    /// Restore a model written by [`TrainedModel::to_bytes`].
    ///
    /// # Errors
    /// `ScrawlError::Serialization` for malformed blobs,
    /// `ScrawlError::Configuration` for an unknown format version,
    /// `ScrawlError::State` if the blob holds an unfinalized emission model,
    /// and `ScrawlError::ModelInvariant` if any table entry is not finite.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let blob: ModelBlob = serde_json::from_slice(bytes)?;
        if blob.version != MODEL_FORMAT_VERSION {
            return Err(ScrawlError::Configuration(format!(
                "unsupported model format version {} (expected {})",
                blob.version, MODEL_FORMAT_VERSION
            )));
        }
        let model = Self::new(blob.corpus, blob.emission)?;
        model.corpus.validate()?;
        model.emission.validate()?;
        debug!(mode = %model.mode(), bytes = bytes.len(), "restored trained model");
        Ok(model)
    }
}

/// Holder for the currently published model.
///
/// Readers take a cheap [`Arc`] snapshot and decode against it without
/// holding the lock; retraining builds a new model and swaps it in whole.
#[derive(Debug)]
pub struct ModelSlot {
    current: RwLock<Arc<TrainedModel>>,
}

impl ModelSlot {
    pub fn new(model: TrainedModel) -> Self {
        Self {
            current: RwLock::new(Arc::new(model)),
        }
    }

    /// The model as currently published.
    pub fn snapshot(&self) -> Arc<TrainedModel> {
        self.current.read().clone()
    }

    /// Replace the published model, returning the previous one.
    pub fn publish(&self, model: TrainedModel) -> Arc<TrainedModel> {
        let mut guard = self.current.write();
        std::mem::replace(&mut *guard, Arc::new(model))
    }
}
