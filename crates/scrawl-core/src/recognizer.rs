//! # Word Recognition
//!
//! Glue between an external per-letter classifier and the HMM decoder: each
//! handwriting sample of a word is classified on its own, then the whole
//! sequence of guesses is decoded into the most likely word.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::alphabet::{Letter, ObservationSequence};
use crate::error::Result;
use crate::model::TrainedModel;

/// Per-sample letter classifier supplied by the caller.
pub trait LetterClassifier {
    /// Predict the letter drawn in one sample's feature vector.
    fn classify(&self, features: &[f64]) -> Result<char>;
}

impl<F> LetterClassifier for F
where
    F: Fn(&[f64]) -> Result<char>,
{
    fn classify(&self, features: &[f64]) -> Result<char> {
        self(features)
    }
}

/// Raw classifier output and the decoded word for one input word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recognition {
    pub observed: String,
    pub decoded: String,
}

/// Classifies samples and decodes them against a model snapshot.
pub struct WordRecognizer<C> {
    classifier: C,
    model: Arc<TrainedModel>,
}

impl<C: LetterClassifier> WordRecognizer<C> {
    pub fn new(classifier: C, model: Arc<TrainedModel>) -> Self {
        Self { classifier, model }
    }

    /// Classify every sample of one word.
    ///
    /// # Errors
    /// Propagates classifier errors, and `ScrawlError::Validation` when the
    /// classifier returns a symbol outside `a..=z`.
    pub fn observe<S: AsRef<[f64]>>(&self, samples: &[S]) -> Result<ObservationSequence> {
        samples
            .iter()
            .map(|sample| {
                let c = self.classifier.classify(sample.as_ref())?;
                Letter::parse(c, "classifier output")
            })
            .collect::<Result<Vec<_>>>()
            .map(ObservationSequence::new)
    }

    /// Recognize one word from its samples.
    pub fn recognize<S: AsRef<[f64]>>(&self, samples: &[S]) -> Result<Recognition> {
        let observations = self.observe(samples)?;
        let decoded = self.model.decoder().decode(&observations)?;
        Ok(Recognition {
            observed: observations.letters().iter().map(|l| l.as_char()).collect(),
            decoded,
        })
    }

    /// Recognize one word, returning only the decoded text.
    pub fn predict_word<S: AsRef<[f64]>>(&self, samples: &[S]) -> Result<String> {
        self.recognize(samples).map(|r| r.decoded)
    }

    pub fn model(&self) -> &Arc<TrainedModel> {
        &self.model
    }
}

/// Running letter and word accuracy for raw classifier output versus
/// decoded output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyTally {
    pub words: usize,
    pub letters: usize,
    pub observed_letters_correct: usize,
    pub decoded_letters_correct: usize,
    pub observed_words_correct: usize,
    pub decoded_words_correct: usize,
}

impl AccuracyTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score one word. Positions beyond the shorter string count as wrong.
    pub fn record(&mut self, actual: &str, recognition: &Recognition) {
        let len = actual.chars().count();
        let observed_hits = matching_positions(actual, &recognition.observed);
        let decoded_hits = matching_positions(actual, &recognition.decoded);

        self.words += 1;
        self.letters += len;
        self.observed_letters_correct += observed_hits;
        self.decoded_letters_correct += decoded_hits;
        if actual == recognition.observed {
            self.observed_words_correct += 1;
        }
        if actual == recognition.decoded {
            self.decoded_words_correct += 1;
        }
    }

    pub fn observed_letter_accuracy(&self) -> f64 {
        ratio(self.observed_letters_correct, self.letters)
    }

    pub fn decoded_letter_accuracy(&self) -> f64 {
        ratio(self.decoded_letters_correct, self.letters)
    }

    pub fn observed_word_accuracy(&self) -> f64 {
        ratio(self.observed_words_correct, self.words)
    }

    pub fn decoded_word_accuracy(&self) -> f64 {
        ratio(self.decoded_words_correct, self.words)
    }
}

fn matching_positions(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).filter(|(x, y)| x == y).count()
}

fn ratio(hits: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emission::EmissionMode;
    use crate::error::ScrawlError;
    use crate::model::TrainingConfig;

    /// Treats the first feature as a letter index; reads 'a' (0) as 'o'.
    fn sloppy_classifier(features: &[f64]) -> Result<char> {
        let idx = features.first().copied().unwrap_or(-1.0);
        if !(0.0..26.0).contains(&idx) {
            return Err(ScrawlError::State("no features".into()));
        }
        let c = (b'a' + idx as u8) as char;
        Ok(if c == 'a' { 'o' } else { c })
    }

    fn samples(word: &str) -> Vec<Vec<f64>> {
        word.bytes().map(|b| vec![(b - b'a') as f64]).collect()
    }

    fn model() -> Arc<TrainedModel> {
        let mut pairs: Vec<(char, char)> = ('a'..='z')
            .flat_map(|c| std::iter::repeat_n((c, c), 20))
            .collect();
        pairs.extend(std::iter::repeat_n(('o', 'a'), 30));
        let corpus = ["cat hat bat mat", "cat sat on the mat"];
        Arc::new(TrainedModel::train(&TrainingConfig::new(), corpus, pairs).unwrap())
    }

    #[test]
    fn test_recognize_corrects_classifier() {
        let recognizer = WordRecognizer::new(sloppy_classifier, model());
        let recognition = recognizer.recognize(&samples("cat")).unwrap();
        assert_eq!(recognition.observed, "cot");
        assert_eq!(recognition.decoded, "cat");
        assert_eq!(recognizer.predict_word(&samples("mat")).unwrap(), "mat");
    }

    #[test]
    fn test_classifier_errors_propagate() {
        let recognizer = WordRecognizer::new(sloppy_classifier, model());
        let empty: Vec<Vec<f64>> = vec![vec![]];
        assert!(matches!(
            recognizer.recognize(&empty),
            Err(ScrawlError::State(_))
        ));

        let shouty = |_: &[f64]| -> Result<char> { Ok('Q') };
        let recognizer = WordRecognizer::new(shouty, model());
        assert!(matches!(
            recognizer.recognize(&samples("q")),
            Err(ScrawlError::Validation { symbol: 'Q', .. })
        ));
    }

    #[test]
    fn test_empty_word() {
        let recognizer = WordRecognizer::new(sloppy_classifier, model());
        let none: Vec<Vec<f64>> = Vec::new();
        assert_eq!(recognizer.predict_word(&none).unwrap(), "");
    }

    #[test]
    fn test_accuracy_tally() {
        let mut tally = AccuracyTally::new();
        tally.record(
            "cat",
            &Recognition {
                observed: "cot".into(),
                decoded: "cat".into(),
            },
        );
        tally.record(
            "on",
            &Recognition {
                observed: "on".into(),
                decoded: "an".into(),
            },
        );

        assert_eq!(tally.words, 2);
        assert_eq!(tally.letters, 5);
        assert!((tally.observed_letter_accuracy() - 4.0 / 5.0).abs() < 1e-12);
        assert!((tally.decoded_letter_accuracy() - 4.0 / 5.0).abs() < 1e-12);
        assert_eq!(tally.observed_word_accuracy(), 0.5);
        assert_eq!(tally.decoded_word_accuracy(), 0.5);
        assert_eq!(AccuracyTally::new().decoded_word_accuracy(), 0.0);
    }

    #[test]
    fn test_mode_is_reported() {
        let recognizer = WordRecognizer::new(sloppy_classifier, model());
        assert_eq!(recognizer.model().mode(), EmissionMode::Direct);
    }
}
