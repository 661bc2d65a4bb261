use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;
use crate::network::model::Param;

/// Batch normalization over the feature axis of an `N × features` matrix.
///
/// Training mode normalizes with the batch statistics and folds them into the
/// running estimates; inference mode uses the running estimates only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchNorm {
    pub gamma: Param,
    pub beta: Param,
    pub running_mean: Vec<f32>,
    pub running_var: Vec<f32>,
    pub momentum: f32,
    pub epsilon: f32,
    #[serde(skip)]
    x_hat: Matrix,
    #[serde(skip)]
    inv_std: Vec<f32>,
}

impl BatchNorm {
    pub fn new(features: usize) -> BatchNorm {
        BatchNorm {
            gamma: Param::new(Matrix::filled(1, features, 1.0)),
            beta: Param::new(Matrix::zeros(1, features)),
            running_mean: vec![0.0; features],
            running_var: vec![1.0; features],
            momentum: 0.1,
            epsilon: 1e-5,
            x_hat: Matrix::default(),
            inv_std: Vec::new(),
        }
    }

    pub fn forward(&mut self, x: &Matrix, training: bool) -> Matrix {
        let (n, f) = (x.rows, x.cols);
        let (mean, inv_std) = if training && n > 0 {
            let mut mean = vec![0.0f32; f];
            for r in 0..n {
                for (m, v) in mean.iter_mut().zip(x.row(r)) {
                    *m += v;
                }
            }
            mean.iter_mut().for_each(|m| *m /= n as f32);

            let mut var = vec![0.0f32; f];
            for r in 0..n {
                for ((s, v), m) in var.iter_mut().zip(x.row(r)).zip(&mean) {
                    *s += (v - m) * (v - m);
                }
            }
            var.iter_mut().for_each(|s| *s /= n as f32);

            // Running variance uses the unbiased estimate.
            let correction = if n > 1 { n as f32 / (n - 1) as f32 } else { 1.0 };
            for j in 0..f {
                self.running_mean[j] = (1.0 - self.momentum) * self.running_mean[j] + self.momentum * mean[j];
                self.running_var[j] = (1.0 - self.momentum) * self.running_var[j]
                    + self.momentum * var[j] * correction;
            }

            let inv_std: Vec<f32> = var.iter().map(|v| 1.0 / (v + self.epsilon).sqrt()).collect();
            (mean, inv_std)
        } else {
            let inv_std = self.running_var.iter().map(|v| 1.0 / (v + self.epsilon).sqrt()).collect();
            (self.running_mean.clone(), inv_std)
        };

        let mut x_hat = Matrix::zeros(n, f);
        let mut y = Matrix::zeros(n, f);
        for r in 0..n {
            for j in 0..f {
                let xh = (x.get(r, j) - mean[j]) * inv_std[j];
                x_hat.data[r * f + j] = xh;
                y.data[r * f + j] = self.gamma.value.data[j] * xh + self.beta.value.data[j];
            }
        }

        if training {
            self.x_hat = x_hat;
            self.inv_std = inv_std;
        }
        y
    }

    /// Backward pass through a training-mode forward.
    pub fn backward(&mut self, grad_out: &Matrix) -> Matrix {
        let (n, f) = (grad_out.rows, grad_out.cols);
        let mut d_gamma = Matrix::zeros(1, f);
        let mut d_beta = Matrix::zeros(1, f);
        let mut sum_dxh = vec![0.0f32; f];
        let mut sum_dxh_xh = vec![0.0f32; f];

        for r in 0..n {
            for j in 0..f {
                let dy = grad_out.get(r, j);
                let xh = self.x_hat.get(r, j);
                d_gamma.data[j] += dy * xh;
                d_beta.data[j] += dy;
                let dxh = dy * self.gamma.value.data[j];
                sum_dxh[j] += dxh;
                sum_dxh_xh[j] += dxh * xh;
            }
        }
        self.gamma.accumulate(&d_gamma);
        self.beta.accumulate(&d_beta);

        let nf = n as f32;
        let mut dx = Matrix::zeros(n, f);
        for r in 0..n {
            for j in 0..f {
                let xh = self.x_hat.get(r, j);
                let dxh = grad_out.get(r, j) * self.gamma.value.data[j];
                dx.data[r * f + j] = self.inv_std[j] / nf * (nf * dxh - sum_dxh[j] - xh * sum_dxh_xh[j]);
            }
        }
        dx
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.gamma, &mut self.beta]
    }
}
