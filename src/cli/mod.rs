// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
//   textclf train [--hidden-sizes 128,64] [--opt sgd] [--cpu] ...
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, TrainArgs};

/// The main CLI struct: clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "textclf",
    version = "0.1.0",
    about = "Train a bidirectional LSTM + attention sentence classifier."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
        }
    }
}

/// Converts CLI args into a TrainConfig and hands off to Layer 2.
fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!(
        "Starting training on '{}' / '{}'",
        args.positive_data_file.display(),
        args.negative_data_file.display()
    );

    let report = TrainUseCase::new(args.into()).execute()?;

    println!("Training complete after {} steps.", report.steps);
    if let Some(last) = report.evaluations.last() {
        println!(
            "Last evaluation (step {}): loss={:.4} | acc={:.1}%",
            last.step, last.loss, last.accuracy * 100.0
        );
    }
    if report.failed_checkpoints > 0 {
        println!("Warning: {} checkpoint(s) could not be written.", report.failed_checkpoints);
    }
    if let Some(latest) = report.checkpoints.last() {
        println!("Latest checkpoint: {}", latest.path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;

    fn parse(args: &[&str]) -> TrainConfig {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Train(a) => a.into(),
        }
    }

    #[test]
    fn test_defaults_match_config_defaults() {
        assert_eq!(parse(&["textclf", "train"]), TrainConfig::default());
    }

    #[test]
    fn test_parses_layer_list_and_flags() {
        let cfg = parse(&[
            "textclf", "train",
            "--hidden-sizes", "64,32,16",
            "--opt", "rmsprop",
            "--keep-prob", "0.8",
            "--cpu",
        ]);
        assert_eq!(cfg.hidden_sizes, vec![64, 32, 16]);
        assert_eq!(cfg.opt, "rmsprop");
        assert!((cfg.keep_prob - 0.8).abs() < 1e-12);
        assert!(cfg.cpu);
    }

    #[test]
    fn test_cnn_options_are_not_accepted() {
        assert!(Cli::try_parse_from(["textclf", "train", "--filter-sizes", "3,4,5"]).is_err());
    }
}
