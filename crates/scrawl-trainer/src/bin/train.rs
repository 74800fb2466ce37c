//! Train, inspect and apply scrawl models from the command line.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use scrawl_core::{EmissionMode, TrainingConfig};
use scrawl_trainer::{
    Trainer, decode_words, ensure_all_decoded, evaluate, load_labeled_words, load_model,
    verify_model_file,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// CLI arguments
#[derive(Parser)]
#[command(name = "scrawl-train")]
#[command(about = "Train and run the scrawl handwriting word decoder")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Model file to write or read
    #[arg(short, long, env = "SCRAWL_MODEL", default_value = "models/scrawl.json")]
    model: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Learn a model from a corpus and labeled classifier output
    Train {
        /// Plain-text corpus of whitespace-separated words
        #[arg(short, long, env = "SCRAWL_CORPUS")]
        corpus: PathBuf,

        /// Labeled pairs, one "<predicted> <true>" per line
        #[arg(short, long, env = "SCRAWL_PAIRS")]
        pairs: PathBuf,

        /// Emission convention: direct or inverse
        #[arg(long, env = "SCRAWL_MODE", default_value_t = EmissionMode::Direct)]
        mode: EmissionMode,

        /// Lowercase and strip punctuation from corpus tokens
        #[arg(long)]
        normalize: bool,
    },
    /// Decode observed letter strings with a saved model
    Decode {
        /// Observed words (one classifier guess per letter)
        #[arg(required = true)]
        words: Vec<String>,
    },
    /// Compare classifier and decoded accuracy on "<observed> <actual>" lines
    Evaluate {
        /// Labeled word file
        #[arg(short, long)]
        words: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            corpus,
            pairs,
            mode,
            normalize,
        } => {
            let config = TrainingConfig::new()
                .with_mode(mode)
                .with_normalized_corpus(normalize);
            let trainer = Trainer::new(config);

            info!("Starting training...");
            let model = trainer.train_from_files(&corpus, &pairs)?;
            trainer.save_model(&model, &cli.model)?;
            verify_model_file(&cli.model, &model)?;
        }
        Commands::Decode { words } => {
            let model = load_model(&cli.model)?;
            let results = decode_words(&model, &words);
            for (word, result) in &results {
                match result {
                    Ok(decoded) => println!("{word}\t{decoded}"),
                    Err(e) => warn!(word = word.as_str(), "decode failed: {}", e),
                }
            }
            ensure_all_decoded(&results)?;
        }
        Commands::Evaluate { words } => {
            let model = load_model(&cli.model)?;
            let labeled = load_labeled_words(&words)?;
            let tally = evaluate(&model, &labeled)?;

            println!("words evaluated:        {}", tally.words);
            println!(
                "classifier letters:     {:.2}%",
                tally.observed_letter_accuracy() * 100.0
            );
            println!(
                "decoded letters:        {:.2}%",
                tally.decoded_letter_accuracy() * 100.0
            );
            println!(
                "classifier words:       {:.2}%",
                tally.observed_word_accuracy() * 100.0
            );
            println!(
                "decoded words:          {:.2}%",
                tally.decoded_word_accuracy() * 100.0
            );
        }
    }

    Ok(())
}
