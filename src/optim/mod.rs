pub mod schedule;
pub mod sgd;

pub use schedule::{adjust_learning_rate, current_learning_rate, learning_rate, LrFamily};
pub use sgd::{Optimizer, ParamGroup, Sgd};
