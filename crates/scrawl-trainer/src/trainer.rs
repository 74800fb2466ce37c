//! Training pipeline from files to a persisted model.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use scrawl_core::{AccuracyTally, Recognition, TrainedModel, TrainingConfig};
use tempfile::NamedTempFile;
use tracing::info;

use crate::data::{LabeledWord, load_corpus, load_pairs};

pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train a model from a corpus file and a labeled-pairs file.
    ///
    /// Either both tables train or no model is produced.
    pub fn train_from_files<C, P>(&self, corpus_path: C, pairs_path: P) -> anyhow::Result<TrainedModel>
    where
        C: AsRef<Path>,
        P: AsRef<Path>,
    {
        let lines = load_corpus(&corpus_path)?;
        let pairs = load_pairs(&pairs_path)?;
        info!(
            lines = lines.len(),
            pairs = pairs.len(),
            mode = %self.config.mode,
            "Loaded training data"
        );

        TrainedModel::train(&self.config, &lines, pairs).with_context(|| {
            format!(
                "training from {} and {}",
                corpus_path.as_ref().display(),
                pairs_path.as_ref().display()
            )
        })
    }

    /// Write a model to `path`, replacing any existing file atomically.
    pub fn save_model<P: AsRef<Path>>(&self, model: &TrainedModel, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let parent_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent_dir)
            .with_context(|| format!("creating {}", parent_dir.display()))?;

        let bytes = model.to_bytes().context("serializing model")?;
        let temp_file = NamedTempFile::new_in(parent_dir)?;
        {
            let mut writer = BufWriter::new(&temp_file);
            writer.write_all(&bytes)?;
            writer.flush()?;
        }
        temp_file
            .persist(path)
            .with_context(|| format!("persisting model to {}", path.display()))?;

        info!("Model saved to {:?}", path);
        Ok(())
    }
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new(TrainingConfig::default())
    }
}

/// Load a model written by [`Trainer::save_model`].
pub fn load_model<P: AsRef<Path>>(path: P) -> anyhow::Result<TrainedModel> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("reading model {}", path.display()))?;
    TrainedModel::from_bytes(&bytes).with_context(|| format!("loading model {}", path.display()))
}

/// Decode every observed word and compare against the written word.
pub fn evaluate(model: &TrainedModel, words: &[LabeledWord]) -> anyhow::Result<AccuracyTally> {
    let decoder = model.decoder();
    let mut tally = AccuracyTally::new();
    for word in words {
        let decoded = decoder
            .decode_str(&word.observed)
            .with_context(|| format!("decoding {:?}", word.observed))?;
        tally.record(
            &word.actual,
            &Recognition {
                observed: word.observed.clone(),
                decoded,
            },
        );
    }
    Ok(tally)
}

/// Decode each observed word on its own; one bad word does not stop the rest.
pub fn decode_words<S: AsRef<str>>(
    model: &TrainedModel,
    words: &[S],
) -> Vec<(String, scrawl_core::Result<String>)> {
    let decoder = model.decoder();
    words
        .iter()
        .map(|word| {
            let word = word.as_ref();
            (word.to_string(), decoder.decode_str(word))
        })
        .collect()
}

/// Fail if any word in `results` could not be decoded.
pub fn ensure_all_decoded(results: &[(String, scrawl_core::Result<String>)]) -> anyhow::Result<()> {
    let failed: Vec<&str> = results
        .iter()
        .filter(|(_, result)| result.is_err())
        .map(|(word, _)| word.as_str())
        .collect();
    anyhow::ensure!(
        failed.is_empty(),
        "{} of {} words failed to decode: {}",
        failed.len(),
        results.len(),
        failed.join(", ")
    );
    Ok(())
}

/// Check that a freshly written model file is readable before reporting
/// success.
pub fn verify_model_file<P: AsRef<Path>>(path: P, expected: &TrainedModel) -> anyhow::Result<()> {
    let path = path.as_ref();
    let restored = load_model(path)?;
    anyhow::ensure!(
        &restored == expected,
        "model at {} does not match what was written",
        path.display()
    );
    Ok(())
}
