pub mod block;
pub mod dense;
pub mod norm;

pub use block::{ResidualBlock, Stage};
pub use dense::Dense;
pub use norm::BatchNorm;
