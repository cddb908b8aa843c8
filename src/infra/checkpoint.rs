// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves full-precision model snapshots with Burn's
// NamedMpkFileRecorder and keeps at most `max_to_keep` of
// them on disk.
//
// File layout:
//   checkpoints/
//     model-100.mpk      ← full parameter snapshot at step 100
//     model-200.mpk      ← full parameter snapshot at step 200
//     checkpoint.json    ← registry: [(step, path), ...] oldest first
//
// Atomicity:
//   A snapshot is first recorded to a hidden staging file in
//   the same directory and then renamed into place. A rename
//   within one directory is atomic, so readers either see the
//   complete model-<step>.mpk or nothing. checkpoint.json is
//   written the same way.
//
// Retention:
//   Entries are kept in insertion (= step) order. When a save
//   pushes the registry past `max_to_keep`, the oldest entry
//   is evicted. Evicted files are deleted only after the new
//   checkpoint.json is in place.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use burn::{
    module::Module,
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
};

use crate::domain::error::TrainError;

/// Extension the MessagePack recorder gives its files
pub const CHECKPOINT_EXT: &str = "mpk";
const INDEX_FILE: &str = "checkpoint.json";

/// One retained snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    pub step: usize,
    pub path: PathBuf,
}

/// Tracks on-disk snapshots and enforces the retention bound.
pub struct CheckpointManager {
    dir:         PathBuf,
    max_to_keep: usize,
    registry:    VecDeque<CheckpointEntry>,
}

impl CheckpointManager {
    /// Create the manager, creating `dir` if needed. An existing
    /// checkpoint.json in `dir` is picked up so retention carries over.
    pub fn new(dir: impl Into<PathBuf>, max_to_keep: usize) -> Result<Self, TrainError> {
        if max_to_keep == 0 {
            return Err(TrainError::config("num_checkpoints must be at least 1"));
        }
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| TrainError::io(&dir, e))?;

        let index = dir.join(INDEX_FILE);
        let registry = if index.exists() {
            let json = fs::read_to_string(&index).map_err(|e| TrainError::io(&index, e))?;
            serde_json::from_str(&json).map_err(|e| TrainError::Persistence {
                path:   index.clone(),
                reason: e.to_string(),
            })?
        } else {
            VecDeque::new()
        };

        Ok(Self { dir, max_to_keep, registry })
    }

    /// Retained snapshots, oldest first.
    pub fn retained(&self) -> impl Iterator<Item = &CheckpointEntry> {
        self.registry.iter()
    }

    pub fn latest(&self) -> Option<&CheckpointEntry> {
        self.registry.back()
    }

    /// Path the snapshot for `step` lives at once saved.
    pub fn path_for(&self, step: usize) -> PathBuf {
        self.dir.join(format!("model-{step}.{CHECKPOINT_EXT}"))
    }

    /// Persist a full snapshot of `model` for `step` and return its path.
    ///
    /// `checkpoint.json` is rewritten before the in-memory registry changes.
    /// If that write fails the new snapshot file is removed again, the
    /// registry is left as it was and the error is returned.
    pub fn save<B: Backend, M: Module<B>>(&mut self, step: usize, model: &M) -> Result<PathBuf, TrainError> {
        // The recorder appends its own extension to the staging stem
        let staged_stem = self.dir.join(format!(".model-{step}-staged"));
        let staged      = staged_stem.with_extension(CHECKPOINT_EXT);
        let target      = self.path_for(step);

        if let Err(e) = model.clone().save_file(staged_stem, &recorder()) {
            fs::remove_file(&staged).ok();
            return Err(TrainError::Persistence { path: staged, reason: e.to_string() });
        }
        if let Err(e) = fs::rename(&staged, &target) {
            fs::remove_file(&staged).ok();
            return Err(TrainError::io(&target, e));
        }

        let replaces_existing = self.registry.iter().any(|entry| entry.step == step);
        let mut next = self.registry.clone();
        next.retain(|entry| entry.step != step);
        next.push_back(CheckpointEntry { step, path: target.clone() });
        let overflow = next.len().saturating_sub(self.max_to_keep);
        let evicted: Vec<CheckpointEntry> = next.drain(..overflow).collect();

        let index: Vec<&CheckpointEntry> = next.iter().collect();
        if let Err(e) = write_json(&self.dir, INDEX_FILE, &index) {
            // A same-step file was already registered; keep it on disk
            if !replaces_existing {
                fs::remove_file(&target).ok();
            }
            return Err(e);
        }
        self.registry = next;

        for entry in evicted {
            match fs::remove_file(&entry.path) {
                Ok(()) => tracing::debug!("Evicted checkpoint for step {}", entry.step),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    "Cannot delete evicted checkpoint '{}': {}", entry.path.display(), e
                ),
            }
        }

        tracing::debug!("Saved checkpoint: step {} → '{}'", step, target.display());
        Ok(target)
    }

    /// Restore the newest retained snapshot into `model`.
    pub fn load_latest<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M, TrainError> {
        let entry = self
            .latest()
            .ok_or_else(|| TrainError::Persistence {
                path:   self.dir.clone(),
                reason: "no checkpoint has been saved yet".to_string(),
            })?;

        tracing::info!("Loading checkpoint from step {}", entry.step);
        model
            .load_file(entry.path.clone(), &recorder(), device)
            .map_err(|e| TrainError::Persistence { path: entry.path.clone(), reason: e.to_string() })
    }
}

/// Full-precision MessagePack recorder; weights round-trip bit for bit.
fn recorder() -> NamedMpkFileRecorder<FullPrecisionSettings> {
    NamedMpkFileRecorder::<FullPrecisionSettings>::new()
}

/// Write `value` as pretty JSON to `dir/name` via stage-then-rename.
pub fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<PathBuf, TrainError> {
    let target = dir.join(name);
    let staged = dir.join(format!(".{name}.staged"));

    let json = serde_json::to_string_pretty(value).map_err(|e| TrainError::Persistence {
        path:   target.clone(),
        reason: e.to_string(),
    })?;
    fs::write(&staged, json).map_err(|e| TrainError::io(&staged, e))?;
    if let Err(e) = fs::rename(&staged, &target) {
        fs::remove_file(&staged).ok();
        return Err(TrainError::io(&target, e));
    }
    Ok(target)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::module::Param;
    use burn::nn::{Linear, LinearConfig};

    type TestBackend = NdArray;

    fn tiny_model() -> Linear<TestBackend> {
        LinearConfig::new(3, 2).init(&Default::default())
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_rejects_zero_retention() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            CheckpointManager::new(dir.path(), 0),
            Err(TrainError::Configuration(_))
        ));
    }

    #[test]
    fn test_save_writes_final_file_only() {
        let dir      = tempfile::tempdir().unwrap();
        let mut ckpt = CheckpointManager::new(dir.path(), 3).unwrap();
        let path     = ckpt.save::<TestBackend, _>(10, &tiny_model()).unwrap();

        assert_eq!(path, dir.path().join("model-10.mpk"));
        assert!(path.exists());
        assert_eq!(files_in(dir.path()), vec!["checkpoint.json", "model-10.mpk"]);
    }

    #[test]
    fn test_retains_only_newest() {
        let dir      = tempfile::tempdir().unwrap();
        let mut ckpt = CheckpointManager::new(dir.path(), 2).unwrap();
        let model    = tiny_model();
        for step in [5, 10, 15, 20, 25] {
            ckpt.save::<TestBackend, _>(step, &model).unwrap();
        }

        let steps: Vec<usize> = ckpt.retained().map(|e| e.step).collect();
        assert_eq!(steps, vec![20, 25]);
        assert_eq!(
            files_in(dir.path()),
            vec!["checkpoint.json", "model-20.mpk", "model-25.mpk"]
        );
    }

    #[test]
    fn test_same_step_replaces_entry() {
        let dir      = tempfile::tempdir().unwrap();
        let mut ckpt = CheckpointManager::new(dir.path(), 2).unwrap();
        let model    = tiny_model();
        ckpt.save::<TestBackend, _>(10, &model).unwrap();
        ckpt.save::<TestBackend, _>(10, &model).unwrap();
        assert_eq!(ckpt.retained().count(), 1);
    }

    #[test]
    fn test_registry_survives_reopen() {
        let dir   = tempfile::tempdir().unwrap();
        let model = tiny_model();
        {
            let mut ckpt = CheckpointManager::new(dir.path(), 2).unwrap();
            ckpt.save::<TestBackend, _>(1, &model).unwrap();
            ckpt.save::<TestBackend, _>(2, &model).unwrap();
        }
        let mut ckpt = CheckpointManager::new(dir.path(), 2).unwrap();
        ckpt.save::<TestBackend, _>(3, &model).unwrap();
        let steps: Vec<usize> = ckpt.retained().map(|e| e.step).collect();
        assert_eq!(steps, vec![2, 3]);
        assert!(!dir.path().join("model-1.mpk").exists());
    }

    #[test]
    fn test_load_latest_restores_weights_exactly() {
        let dir      = tempfile::tempdir().unwrap();
        let device   = Default::default();
        let mut ckpt = CheckpointManager::new(dir.path(), 2).unwrap();

        // Values outside half-precision range and resolution
        let values = [0.1234567_f32, 1e-6, 70000.0, -3.3333333];
        let mut saved: Linear<TestBackend> = LinearConfig::new(2, 2).init(&device);
        saved.weight = Param::from_tensor(
            Tensor::<TestBackend, 1>::from_floats(values, &device).reshape([2, 2]),
        );
        ckpt.save::<TestBackend, _>(7, &saved).unwrap();

        let fresh    = LinearConfig::new(2, 2).init(&device);
        let restored = ckpt.load_latest::<TestBackend, _>(fresh, &device).unwrap();

        let b: Vec<f32> = restored.weight.val().into_data().convert::<f32>().to_vec().unwrap();
        assert_eq!(b, values.to_vec());
    }

    #[test]
    fn test_load_without_checkpoint_fails() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path(), 2).unwrap();
        let res  = ckpt.load_latest::<TestBackend, _>(tiny_model(), &Default::default());
        assert!(matches!(res, Err(TrainError::Persistence { .. })));
    }

    #[test]
    fn test_unwritable_directory_reports_error() {
        let dir      = tempfile::tempdir().unwrap();
        let ckpt_dir = dir.path().join("ckpt");
        let mut ckpt = CheckpointManager::new(&ckpt_dir, 2).unwrap();
        // Replace the directory with a plain file: every write below it fails
        fs::remove_dir_all(&ckpt_dir).unwrap();
        fs::write(&ckpt_dir, b"not a directory").unwrap();

        let err = ckpt.save::<TestBackend, _>(1, &tiny_model()).unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(ckpt.retained().count(), 0);
    }

    #[test]
    fn test_index_failure_leaves_no_checkpoint_behind() {
        let dir      = tempfile::tempdir().unwrap();
        let mut ckpt = CheckpointManager::new(dir.path(), 2).unwrap();
        // The index cannot be renamed onto a directory
        fs::create_dir(dir.path().join("checkpoint.json")).unwrap();

        let res = ckpt.save::<TestBackend, _>(5, &tiny_model());
        assert!(matches!(res, Err(TrainError::Io { .. })));
        assert_eq!(ckpt.retained().count(), 0);
        assert!(!dir.path().join("model-5.mpk").exists());
        assert!(!dir.path().join(".checkpoint.json.staged").exists());
    }

    #[test]
    fn test_index_failure_keeps_previous_retention() {
        let dir      = tempfile::tempdir().unwrap();
        let mut ckpt = CheckpointManager::new(dir.path(), 1).unwrap();
        let model    = tiny_model();
        ckpt.save::<TestBackend, _>(1, &model).unwrap();

        fs::remove_file(dir.path().join("checkpoint.json")).unwrap();
        fs::create_dir(dir.path().join("checkpoint.json")).unwrap();
        assert!(ckpt.save::<TestBackend, _>(2, &model).is_err());

        // Step 1 would have been evicted; it must survive the failed save
        let steps: Vec<usize> = ckpt.retained().map(|e| e.step).collect();
        assert_eq!(steps, vec![1]);
        assert!(dir.path().join("model-1.mpk").exists());
        assert!(!dir.path().join("model-2.mpk").exists());
    }

    #[test]
    fn test_write_json_stages_then_renames() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_json(dir.path(), "run.json", &vec![1, 2, 3]).unwrap();

        assert_eq!(path, dir.path().join("run.json"));
        let back: Vec<i32> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, vec![1, 2, 3]);
        assert_eq!(files_in(dir.path()), vec!["run.json"]);
    }
}
