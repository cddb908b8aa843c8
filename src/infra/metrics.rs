// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records scalar summaries to CSV files for external
// monitoring and plotting.
//
//   metrics.csv        one row per training step and per
//                      evaluation:
//                        split,step,loss,accuracy,grad_norm
//                      (grad_norm is empty for dev rows)
//
//   grad_sparsity.csv  fraction of exactly-zero gradient
//                      entries per parameter per step:
//                        step,param,zero_fraction
//
// Example metrics.csv output:
//   split,step,loss,accuracy,grad_norm
//   train,1,0.693147,0.500000,0.412300
//   train,2,0.690012,0.600000,0.398100
//   dev,2,0.689500,0.550000,
//
// How to read the metrics:
//   - Loss should decrease over steps (model is learning)
//   - If dev loss rises while train loss falls → overfitting
//   - A grad_norm pinned at max_grad_norm means clipping is
//     active on most steps
//
// Reference: Rust Book §12 (I/O and File Handling)

use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::error::TrainError;

/// Which split a metrics row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Dev,
}

impl Split {
    fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Dev   => "dev",
        }
    }
}

/// One row of metrics.csv
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepMetrics {
    pub split:     Split,
    pub step:      usize,
    pub loss:      f64,
    pub accuracy:  f64,
    /// Global gradient norm before clipping (training rows only)
    pub grad_norm: Option<f64>,
}

impl StepMetrics {
    pub fn train(step: usize, loss: f64, accuracy: f64, grad_norm: f64) -> Self {
        Self { split: Split::Train, step, loss, accuracy, grad_norm: Some(grad_norm) }
    }

    pub fn dev(step: usize, loss: f64, accuracy: f64) -> Self {
        Self { split: Split::Dev, step, loss, accuracy, grad_norm: None }
    }
}

/// Appends metrics rows to CSV files in one directory.
pub struct MetricsLogger {
    csv_path:      PathBuf,
    sparsity_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV headers if the files don't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, TrainError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| TrainError::io(dir, e))?;

        let csv_path      = dir.join("metrics.csv");
        let sparsity_path = dir.join("grad_sparsity.csv");
        write_header(&csv_path, "split,step,loss,accuracy,grad_norm")?;
        write_header(&sparsity_path, "step,param,zero_fraction")?;

        Ok(Self { csv_path, sparsity_path })
    }

    /// Append one metrics row.
    pub fn log(&self, m: &StepMetrics) -> Result<(), TrainError> {
        let grad_norm = m.grad_norm.map(|g| format!("{g:.6}")).unwrap_or_default();
        append_line(
            &self.csv_path,
            &format!("{},{},{:.6},{:.6},{}", m.split.as_str(), m.step, m.loss, m.accuracy, grad_norm),
        )?;

        tracing::debug!(
            "Logged {} metrics for step {}: loss={:.4}, acc={:.4}",
            m.split.as_str(),
            m.step,
            m.loss,
            m.accuracy,
        );
        Ok(())
    }

    /// Append one row per (parameter, zero fraction) pair.
    pub fn log_sparsity(&self, step: usize, sparsity: &[(String, f64)]) -> Result<(), TrainError> {
        if sparsity.is_empty() {
            return Ok(());
        }
        let rows: String = sparsity
            .iter()
            .map(|(param, frac)| format!("{step},{param},{frac:.6}\n"))
            .collect();
        append_line(&self.sparsity_path, rows.trim_end())
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }

    pub fn sparsity_path(&self) -> &PathBuf {
        &self.sparsity_path
    }
}

fn write_header(path: &Path, header: &str) -> Result<(), TrainError> {
    if path.exists() {
        return Ok(());
    }
    let mut f = fs::File::create(path).map_err(|e| TrainError::io(path, e))?;
    writeln!(f, "{header}").map_err(|e| TrainError::io(path, e))?;
    tracing::debug!("Created metrics CSV: '{}'", path.display());
    Ok(())
}

fn append_line(path: &Path, line: &str) -> Result<(), TrainError> {
    let mut f = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| TrainError::io(path, e))?;
    writeln!(f, "{line}").map_err(|e| TrainError::io(path, e))
}
