use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// A batch of images in NCHW layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBatch {
    pub n: usize,
    pub c: usize,
    pub h: usize,
    pub w: usize,
    pub data: Vec<f32>,
}

impl ImageBatch {
    pub fn zeros(n: usize, c: usize, h: usize, w: usize) -> ImageBatch {
        ImageBatch { n, c, h, w, data: vec![0.0; n * c * h * w] }
    }

    pub fn from_vec(n: usize, c: usize, h: usize, w: usize, data: Vec<f32>) -> Result<ImageBatch> {
        if data.len() != n * c * h * w {
            return Err(Error::dataset(format!(
                "image buffer holds {} values, expected {}x{}x{}x{} = {}",
                data.len(), n, c, h, w, n * c * h * w
            )));
        }
        Ok(ImageBatch { n, c, h, w, data })
    }

    /// Values per sample (`c * h * w`).
    #[inline]
    pub fn sample_len(&self) -> usize {
        self.c * self.h * self.w
    }

    #[inline]
    pub fn index(&self, n: usize, c: usize, y: usize, x: usize) -> usize {
        ((n * self.c + c) * self.h + y) * self.w + x
    }

    pub fn sample(&self, n: usize) -> &[f32] {
        let len = self.sample_len();
        &self.data[n * len..(n + 1) * len]
    }

    pub fn sample_mut(&mut self, n: usize) -> &mut [f32] {
        let len = self.sample_len();
        &mut self.data[n * len..(n + 1) * len]
    }

    /// Builds a new batch whose sample `i` is `self`'s sample `indices[i]`.
    pub fn gather(&self, indices: &[usize]) -> ImageBatch {
        let len = self.sample_len();
        let mut data = Vec::with_capacity(indices.len() * len);
        for &i in indices {
            data.extend_from_slice(self.sample(i));
        }
        ImageBatch { n: indices.len(), c: self.c, h: self.h, w: self.w, data }
    }

    /// Flattens each sample into one row of an `n × (c·h·w)` matrix.
    pub fn to_matrix(&self) -> Matrix {
        Matrix::from_vec(self.n, self.sample_len(), self.data.clone())
    }

    pub fn into_matrix(self) -> Matrix {
        let cols = self.sample_len();
        Matrix::from_vec(self.n, cols, self.data)
    }
}

/// One mini-batch: images paired with their integer class labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub images: ImageBatch,
    pub labels: Vec<usize>,
}

impl Batch {
    pub fn new(images: ImageBatch, labels: Vec<usize>) -> Result<Batch> {
        if images.n != labels.len() {
            return Err(Error::dataset(format!(
                "batch has {} images but {} labels",
                images.n,
                labels.len()
            )));
        }
        Ok(Batch { images, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_reorders_samples() {
        let batch = ImageBatch::from_vec(3, 1, 1, 2, vec![0.0, 1.0, 10.0, 11.0, 20.0, 21.0]).unwrap();
        let g = batch.gather(&[2, 0, 2]);
        assert_eq!(g.n, 3);
        assert_eq!(g.data, vec![20.0, 21.0, 0.0, 1.0, 20.0, 21.0]);
    }

    #[test]
    fn nchw_indexing() {
        let batch = ImageBatch::zeros(2, 3, 4, 5);
        assert_eq!(batch.index(1, 2, 3, 4), batch.data.len() - 1);
        assert_eq!(batch.index(0, 1, 0, 0), 20);
    }

    #[test]
    fn batch_rejects_mismatched_labels() {
        let images = ImageBatch::zeros(2, 1, 2, 2);
        assert!(matches!(Batch::new(images, vec![0]), Err(Error::Dataset(_))));
    }
}
