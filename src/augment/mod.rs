//! Input-space augmentation of training mini-batches.
//!
//! One `Augmentation` is active per run. Applying it to a batch yields the
//! (possibly perturbed) images plus a `MixedTarget` describing how the loss
//! is composed from one or more label batches.

pub mod bbox;
pub mod random;
pub mod strategy;
pub mod target;

pub use bbox::{box_lambda, rand_bbox, BBox};
pub use random::{RandomSource, ScriptedRandom, StdRandom};
pub use strategy::{AugmentParams, Augmentation, Augmented, ProcessKind};
pub use target::{MixedTarget, WeightedLabels};
