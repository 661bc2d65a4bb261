use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;
use crate::network::model::Param;

/// Fully connected layer: `y = x · W + b`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub weights: Param, // (input_size, size)
    pub biases: Param,  // (1, size)
    #[serde(skip)]
    input: Matrix, // last training-mode input, needed for the weight gradient
}

impl Dense {
    pub fn new(input_size: usize, size: usize) -> Dense {
        Dense::with_rng(input_size, size, &mut rand::thread_rng())
    }

    /// He-initialized weights drawn from `rng`, zero biases.
    pub fn with_rng<R: Rng + ?Sized>(input_size: usize, size: usize, rng: &mut R) -> Dense {
        Dense {
            weights: Param::new(Matrix::he_with(input_size, size, rng)),
            biases: Param::new(Matrix::zeros(1, size)),
            input: Matrix::default(),
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.value.rows
    }

    pub fn size(&self) -> usize {
        self.weights.value.cols
    }

    pub fn forward(&mut self, x: &Matrix, training: bool) -> Matrix {
        let mut z = x * &self.weights.value;
        z.add_row_broadcast(&self.biases.value.data);
        if training {
            self.input = x.clone();
        }
        z
    }

    /// Accumulates weight and bias gradients without propagating further.
    pub fn backward_params(&mut self, grad_out: &Matrix) {
        let w_grad = &self.input.transpose() * grad_out;
        self.weights.accumulate(&w_grad);
        self.biases.accumulate(&grad_out.sum_rows());
    }

    /// Accumulates parameter gradients and returns `∂L/∂x`.
    pub fn backward(&mut self, grad_out: &Matrix) -> Matrix {
        self.backward_params(grad_out);
        grad_out * &self.weights.value.transpose()
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.weights, &mut self.biases]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_and_backward_shapes() {
        let mut layer = Dense::new(3, 2);
        layer.weights.value = Matrix::from_vec(3, 2, vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        layer.biases.value = Matrix::from_vec(1, 2, vec![0.5, -0.5]);

        let x = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 0.0, 0.0, 1.0]);
        let y = layer.forward(&x, true);
        assert_eq!(y.data, vec![4.5, 4.5, 1.5, 0.5]);

        let dx = layer.backward(&Matrix::filled(2, 2, 1.0));
        assert_eq!((dx.rows, dx.cols), (2, 3));
        assert_eq!(dx.data, vec![1.0, 1.0, 2.0, 1.0, 1.0, 2.0]);
        // dW = xᵀ · 1
        assert_eq!(layer.weights.grad.data, vec![1.0, 1.0, 2.0, 2.0, 4.0, 4.0]);
        assert_eq!(layer.biases.grad.data, vec![2.0, 2.0]);
    }
}
