use serde::{Serialize, Deserialize};

use crate::math::image_batch::ImageBatch;
use crate::math::matrix::Matrix;

/// A trainable tensor together with its accumulated gradient.
///
/// Only `value` and `group` are persisted; the gradient buffer is rebuilt on
/// the first `zero_grad`/`accumulate` after loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub value: Matrix,
    #[serde(skip)]
    pub grad: Matrix,
    /// Index of the optimizer parameter group this tensor belongs to.
    #[serde(default)]
    pub group: usize,
}

impl Param {
    pub fn new(value: Matrix) -> Param {
        let grad = Matrix::zeros(value.rows, value.cols);
        Param { value, grad, group: 0 }
    }

    fn ensure_grad(&mut self) {
        if self.grad.rows != self.value.rows || self.grad.cols != self.value.cols {
            self.grad = Matrix::zeros(self.value.rows, self.value.cols);
        }
    }

    pub fn zero_grad(&mut self) {
        self.ensure_grad();
        self.grad.data.fill(0.0);
    }

    pub fn accumulate(&mut self, grad: &Matrix) {
        self.ensure_grad();
        assert_eq!(grad.data.len(), self.grad.data.len(), "gradient shape mismatch");
        for (g, d) in self.grad.data.iter_mut().zip(&grad.data) {
            *g += d;
        }
    }

    pub fn len(&self) -> usize {
        self.value.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.data.is_empty()
    }
}

/// The classifier the training loop drives.
///
/// `forward` maps an image batch to an `N × classes` logit matrix; in training
/// mode it also keeps whatever activations `backward` needs. `backward` takes
/// `∂loss/∂logits` for the batch last passed to `forward` and adds the
/// parameter gradients into each `Param::grad`.
pub trait Model {
    fn forward(&mut self, images: &ImageBatch) -> Matrix;

    fn backward(&mut self, grad_logits: &Matrix);

    /// Switches between training mode (batch statistics, activation caching)
    /// and inference mode.
    fn set_training(&mut self, training: bool);

    fn params_mut(&mut self) -> Vec<&mut Param>;

    /// Architecture tag recorded in checkpoints.
    fn arch(&self) -> &str;
}
