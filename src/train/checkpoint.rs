//! Checkpoint persistence for training runs.
//!
//! Layout under the runs directory:
//!
//! ```text
//! <root>/<expname>/checkpoint.json   latest epoch, overwritten every epoch
//! <root>/<expname>/model_best.json   copy of the checkpoint with the lowest top-1 error
//! <root>/<expname>/history.json      per-epoch statistics
//! <root>/<expname>/config.json       run configuration
//! ```

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::train::epoch_stats::EpochStats;
use crate::train::state::TrainingState;

pub const CHECKPOINT_FILE: &str = "checkpoint.json";
pub const BEST_FILE: &str = "model_best.json";
pub const HISTORY_FILE: &str = "history.json";
pub const CONFIG_FILE: &str = "config.json";

/// Reads and writes the per-experiment artifacts under one root directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    root: PathBuf,
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

impl CheckpointManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding every artifact of `expname`.
    pub fn experiment_dir(&self, expname: &str) -> PathBuf {
        self.root.join(expname)
    }

    pub fn checkpoint_path(&self, expname: &str) -> PathBuf {
        self.experiment_dir(expname).join(CHECKPOINT_FILE)
    }

    pub fn best_path(&self, expname: &str) -> PathBuf {
        self.experiment_dir(expname).join(BEST_FILE)
    }

    fn ensure_dir(&self, expname: &str) -> Result<PathBuf> {
        if expname.is_empty() {
            return Err(Error::config("experiment name must not be empty"));
        }
        let dir = self.experiment_dir(expname);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Writes `state` to the experiment's checkpoint file, then copies it to
    /// the best file when `is_best`. The copy happens only after the
    /// checkpoint has been fully written and flushed.
    pub fn save<M: Serialize, O: Serialize>(
        &self,
        state: &TrainingState<M, O>,
        is_best: bool,
        expname: &str,
    ) -> Result<PathBuf> {
        let dir = self.ensure_dir(expname)?;
        let path = dir.join(CHECKPOINT_FILE);
        write_json(&path, state)?;
        debug!(path = %path.display(), epoch = state.epoch, "saved checkpoint");

        if is_best {
            let best = dir.join(BEST_FILE);
            fs::copy(&path, &best)?;
            debug!(path = %best.display(), err1 = state.best_err1, "updated best checkpoint");
        }
        Ok(path)
    }

    /// Latest checkpoint of `expname`.
    pub fn load<M: DeserializeOwned, O: DeserializeOwned>(&self, expname: &str) -> Result<TrainingState<M, O>> {
        read_json(&self.checkpoint_path(expname))
    }

    /// Best checkpoint of `expname`.
    pub fn load_best<M: DeserializeOwned, O: DeserializeOwned>(&self, expname: &str) -> Result<TrainingState<M, O>> {
        read_json(&self.best_path(expname))
    }

    pub fn has_checkpoint(&self, expname: &str) -> bool {
        self.checkpoint_path(expname).is_file()
    }

    pub fn save_history(&self, expname: &str, history: &[EpochStats]) -> Result<()> {
        let dir = self.ensure_dir(expname)?;
        write_json(&dir.join(HISTORY_FILE), history)
    }

    /// Recorded history, or an empty list for a fresh experiment.
    pub fn load_history(&self, expname: &str) -> Result<Vec<EpochStats>> {
        let path = self.experiment_dir(expname).join(HISTORY_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_json(&path)
    }

    pub fn save_config<T: Serialize>(&self, expname: &str, config: &T) -> Result<PathBuf> {
        let dir = self.ensure_dir(expname)?;
        let path = dir.join(CONFIG_FILE);
        write_json(&path, config)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type State = TrainingState<Vec<f32>, Vec<f64>>;

    fn state(epoch: usize, err1: f64) -> State {
        let mut s = TrainingState::new("resnet", vec![1.0, 2.0], vec![0.1]);
        s.epoch = epoch;
        s.best_err1 = err1;
        s
    }

    #[test]
    fn save_creates_namespace_and_copies_best() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());

        manager.save(&state(0, 50.0), true, "exp").unwrap();
        assert!(manager.checkpoint_path("exp").is_file());
        assert!(manager.best_path("exp").is_file());

        manager.save(&state(1, 50.0), false, "exp").unwrap();
        let latest: State = manager.load("exp").unwrap();
        let best: State = manager.load_best("exp").unwrap();
        assert_eq!(latest.epoch, 1);
        assert_eq!(best.epoch, 0);
        assert_eq!(best.model, vec![1.0, 2.0]);
    }

    #[test]
    fn best_is_not_written_without_improvement() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        manager.save(&state(0, 80.0), false, "exp").unwrap();
        assert!(!manager.best_path("exp").exists());
        assert!(manager.has_checkpoint("exp"));
    }

    #[test]
    fn missing_checkpoint_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        let err = manager.load::<Vec<f32>, Vec<f64>>("nothing").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(manager.load_history("nothing").unwrap().is_empty());
    }

    #[test]
    fn empty_experiment_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        assert!(matches!(manager.save(&state(0, 1.0), false, ""), Err(Error::Config(_))));
    }
}
