//! Data loading for corpus text and labeled classifier output.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use tracing::warn;

/// Read a corpus file, one line per entry.
pub fn load_corpus<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<String>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening corpus {}", path.display()))?;
    BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("reading corpus {}", path.display()))
}

/// Read `(predicted, true)` letter pairs, one `"<predicted> <true>"` per line.
///
/// Blank lines and `#` comments are skipped. Lines that are not two single
/// characters are dropped with a warning; out-of-alphabet letters are passed
/// through so training can reject them.
pub fn load_pairs<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<(char, char)>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening pairs {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut pairs = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading pairs {}", path.display()))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_pair(line) {
            Some(pair) => pairs.push(pair),
            None => warn!(line = line_no + 1, content = line, "skipping malformed pair"),
        }
    }

    Ok(pairs)
}

fn parse_pair(line: &str) -> Option<(char, char)> {
    let mut fields = line.split_whitespace();
    let predicted = single_char(fields.next()?)?;
    let actual = single_char(fields.next()?)?;
    fields.next().is_none().then_some((predicted, actual))
}

fn single_char(field: &str) -> Option<char> {
    let mut chars = field.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

/// An observed (classifier) word and the word that was actually written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledWord {
    pub observed: String,
    pub actual: String,
}

/// Read `"<observed> <actual>"` word pairs for evaluation.
///
/// Pairs whose lengths differ are dropped with a warning.
pub fn load_labeled_words<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<LabeledWord>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("opening labeled words {}", path.display()))?;

    let mut words = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading labeled words {}", path.display()))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [observed, actual] if observed.chars().count() == actual.chars().count() => {
                words.push(LabeledWord {
                    observed: observed.to_string(),
                    actual: actual.to_string(),
                });
            }
            _ => warn!(line = line_no + 1, content = line, "skipping malformed labeled word"),
        }
    }

    Ok(words)
}
