pub mod checkpoint;
pub mod epoch_stats;
pub mod loop_fn;
pub mod meter;
pub mod state;
pub mod train_config;

pub use checkpoint::CheckpointManager;
pub use epoch_stats::EpochStats;
pub use loop_fn::{train_epoch, train_loop, validate, PassMetrics};
pub use meter::{top_k_errors, AverageMeter};
pub use state::TrainingState;
pub use train_config::TrainConfig;
