use serde::{Serialize, Deserialize};

/// Per-epoch training statistics collected by `train_loop`.
///
/// The full list is rewritten to `history.json` after every epoch so a run
/// can be plotted while it is still going.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 0-based epoch index, as printed in the log lines.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Learning rate used throughout this epoch.
    pub lr: f64,
    /// Mean composite training loss over all samples in this epoch.
    pub train_loss: f64,
    /// Top-1 / top-5 training error (percent) against the unmixed labels.
    pub train_top1: f64,
    pub train_top5: f64,
    /// Mean evaluation loss over the held-out set.
    pub val_loss: f64,
    /// Top-1 / top-5 evaluation error (percent).
    pub val_top1: f64,
    pub val_top5: f64,
    /// Wall-clock duration of training plus evaluation in milliseconds.
    pub elapsed_ms: u64,
}
