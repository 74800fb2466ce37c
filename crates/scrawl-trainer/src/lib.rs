//! # Scrawl Trainer
//!
//! File-facing side of scrawl: loads the corpus and the classifier's labeled
//! output, trains a [`TrainedModel`](scrawl_core::TrainedModel), and reads and
//! writes model files.

pub mod data;
pub mod trainer;

pub use data::{LabeledWord, load_corpus, load_labeled_words, load_pairs};
pub use trainer::{
    Trainer, decode_words, ensure_all_decoded, evaluate, load_model, verify_model_file,
};
