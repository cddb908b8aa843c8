// ============================================================
// Layer 3 — Training Error Taxonomy
// ============================================================
// Every failure the core can report, grouped by how the
// training loop reacts to it:
//
//   Configuration     — fatal, raised before any step runs
//   ShapeMismatch     — fatal, raised before any step runs
//   NumericDivergence — fatal, aborts the loop mid-training
//   Persistence / Io  — recoverable inside the loop
//                       (checkpoint and metrics writes)
//
// The application layer wraps these in anyhow::Error.
//
// Reference: Rust Book §9 (Recoverable Errors with Result)

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("shape mismatch in {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what:     &'static str,
        expected: usize,
        found:    usize,
    },

    #[error("non-finite {quantity} ({value}) at step {step}")]
    NumericDivergence {
        step:     usize,
        quantity: &'static str,
        value:    f64,
    },

    #[error("cannot persist '{}': {reason}", path.display())]
    Persistence { path: PathBuf, reason: String },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TrainError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Whether the training loop may log this error and keep going.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Persistence { .. } | Self::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(!TrainError::config("x").is_recoverable());
        assert!(!TrainError::NumericDivergence { step: 3, quantity: "loss", value: f64::NAN }
            .is_recoverable());
        assert!(TrainError::Persistence { path: "a".into(), reason: "disk full".into() }
            .is_recoverable());
    }

    #[test]
    fn test_display_mentions_step() {
        let e = TrainError::NumericDivergence { step: 7, quantity: "loss", value: f64::INFINITY };
        assert_eq!(e.to_string(), "non-finite loss (inf) at step 7");
    }
}
