//! # Scrawl
//!
//! Recover handwritten words from a noisy per-letter classifier using a
//! letter-bigram Hidden Markov Model and Viterbi decoding.
//!
//! This crate re-exports [`scrawl_core`] for training and decoding, and
//! [`scrawl_trainer`] for file-based training pipelines.

pub use scrawl_core::*;
pub use scrawl_trainer as trainer;
