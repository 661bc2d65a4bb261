pub mod matrix;
pub mod image_batch;

pub use matrix::Matrix;
pub use image_batch::{Batch, ImageBatch};
