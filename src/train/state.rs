use serde::{Serialize, Deserialize};

/// Everything a checkpoint holds: progress, best errors, model and optimizer.
///
/// Errors are percentages; lower is better and both start at 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingState<M, O> {
    /// Last completed epoch (0-based).
    pub epoch: usize,
    pub arch: String,
    pub best_err1: f64,
    pub best_err5: f64,
    pub model: M,
    pub optimizer: O,
}

impl<M, O> TrainingState<M, O> {
    pub fn new(arch: impl Into<String>, model: M, optimizer: O) -> Self {
        TrainingState {
            epoch: 0,
            arch: arch.into(),
            best_err1: 100.0,
            best_err5: 100.0,
            model,
            optimizer,
        }
    }

    /// Folds in one evaluation result and reports whether it is the new best.
    ///
    /// Ties count as an improvement. Top-5 is only replaced together with
    /// top-1, so the pair always comes from the same epoch.
    pub fn record(&mut self, err1: f64, err5: f64) -> bool {
        let is_best = err1 <= self.best_err1;
        if is_best {
            self.best_err1 = err1;
            self.best_err5 = err5;
        }
        is_best
    }
}
