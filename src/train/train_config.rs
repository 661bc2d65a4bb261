use crate::augment::strategy::Augmentation;
use crate::optim::schedule::LrFamily;

/// Configuration for a `train_loop` run.
///
/// # Fields
/// - `epochs`       — total number of epochs in the schedule
/// - `start_epoch`  — first epoch to run (non-zero when resuming)
/// - `base_lr`      — learning rate before any decay
/// - `lr_family`    — which decay schedule applies
/// - `print_freq`   — per-batch lines are logged every `print_freq` batches
/// - `verbose`      — enables the per-batch lines
/// - `expname`      — experiment namespace for checkpoints and history
/// - `augmentation` — the one strategy applied to every training batch
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub epochs: usize,
    pub start_epoch: usize,
    pub base_lr: f64,
    pub lr_family: LrFamily,
    pub print_freq: usize,
    pub verbose: bool,
    pub expname: String,
    pub augmentation: Augmentation,
}

impl TrainConfig {
    /// Creates a quiet configuration starting at epoch 0 with no augmentation.
    pub fn new(epochs: usize, base_lr: f64, lr_family: LrFamily, expname: impl Into<String>) -> Self {
        TrainConfig {
            epochs,
            start_epoch: 0,
            base_lr,
            lr_family,
            print_freq: 100,
            verbose: false,
            expname: expname.into(),
            augmentation: Augmentation::None,
        }
    }

    pub fn with_augmentation(mut self, augmentation: Augmentation) -> Self {
        self.augmentation = augmentation;
        self
    }

    pub fn with_start_epoch(mut self, start_epoch: usize) -> Self {
        self.start_epoch = start_epoch;
        self
    }

    pub fn with_logging(mut self, print_freq: usize, verbose: bool) -> Self {
        self.print_freq = print_freq;
        self.verbose = verbose;
        self
    }

    /// Whether batch `i` gets a progress line.
    pub fn should_print(&self, i: usize) -> bool {
        self.verbose && self.print_freq > 0 && i % self.print_freq == 0
    }
}
