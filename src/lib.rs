pub mod error;
pub mod math;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod augment;
pub mod data;
pub mod train;
pub mod config;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::{Batch, ImageBatch, Matrix};
pub use network::{Architecture, Model, Network, Param};
pub use loss::cross_entropy::CrossEntropyLoss;
pub use optim::{Optimizer, Sgd};
pub use augment::{AugmentParams, Augmentation, MixedTarget, RandomSource, ScriptedRandom, StdRandom};
pub use data::{DataLoader, Dataset, DatasetKind, InMemoryDataset};
pub use train::{train_loop, CheckpointManager, EpochStats, TrainConfig, TrainingState};
pub use config::Args;
