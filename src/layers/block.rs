use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::layers::dense::Dense;
use crate::layers::norm::BatchNorm;
use crate::math::matrix::Matrix;
use crate::network::model::Param;

/// Dense layer followed by batch normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub dense: Dense,
    pub norm: BatchNorm,
}

impl Stage {
    pub fn new<R: Rng + ?Sized>(input_size: usize, size: usize, rng: &mut R) -> Stage {
        Stage { dense: Dense::with_rng(input_size, size, rng), norm: BatchNorm::new(size) }
    }

    pub fn forward(&mut self, x: &Matrix, training: bool) -> Matrix {
        let z = self.dense.forward(x, training);
        self.norm.forward(&z, training)
    }

    pub fn backward(&mut self, grad: &Matrix) -> Matrix {
        let g = self.norm.backward(grad);
        self.dense.backward(&g)
    }

    /// Backward pass that stops at the dense layer's parameters.
    pub fn backward_params(&mut self, grad: &Matrix) {
        let g = self.norm.backward(grad);
        self.dense.backward_params(&g);
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        let mut params = self.dense.params_mut();
        params.extend(self.norm.params_mut());
        params
    }
}

/// Residual block: `relu(stages(x) + shortcut(x))`.
///
/// Stages are separated by ReLU. When the output is wider than the input the
/// shortcut zero-pads the extra features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidualBlock {
    pub stages: Vec<Stage>,
    pub in_width: usize,
    pub out_width: usize,
    #[serde(skip)]
    masks: Vec<Matrix>, // one ReLU mask per stage boundary, then the output mask
}

impl ResidualBlock {
    /// Two-stage block: `in → planes → planes`.
    pub fn basic<R: Rng + ?Sized>(in_width: usize, planes: usize, rng: &mut R) -> ResidualBlock {
        ResidualBlock {
            stages: vec![Stage::new(in_width, planes, rng), Stage::new(planes, planes, rng)],
            in_width,
            out_width: planes,
            masks: Vec::new(),
        }
    }

    /// Three-stage bottleneck block: `in → planes → planes → 4·planes`.
    pub fn bottleneck<R: Rng + ?Sized>(in_width: usize, planes: usize, rng: &mut R) -> ResidualBlock {
        ResidualBlock {
            stages: vec![
                Stage::new(in_width, planes, rng),
                Stage::new(planes, planes, rng),
                Stage::new(planes, planes * 4, rng),
            ],
            in_width,
            out_width: planes * 4,
            masks: Vec::new(),
        }
    }

    pub fn forward(&mut self, x: &Matrix, training: bool) -> Matrix {
        let last = self.stages.len() - 1;
        let mut masks = Vec::with_capacity(self.stages.len());
        let mut h = x.clone();
        for (i, stage) in self.stages.iter_mut().enumerate() {
            h = stage.forward(&h, training);
            if i < last {
                masks.push(relu_in_place(&mut h));
            }
        }
        let mut out = &h + &resize_features(x, self.out_width);
        masks.push(relu_in_place(&mut out));
        if training {
            self.masks = masks;
        }
        out
    }

    pub fn backward(&mut self, grad_out: &Matrix) -> Matrix {
        let last = self.stages.len() - 1;
        let g = hadamard(grad_out, &self.masks[last]);
        let mut gh = g.clone();
        for i in (0..=last).rev() {
            if i < last {
                gh = hadamard(&gh, &self.masks[i]);
            }
            gh = self.stages[i].backward(&gh);
        }
        &gh + &resize_features(&g, self.in_width)
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        self.stages.iter_mut().flat_map(|s| s.params_mut()).collect()
    }
}

/// Applies ReLU in place and returns the 0/1 derivative mask.
pub fn relu_in_place(m: &mut Matrix) -> Matrix {
    let mut mask = Matrix::zeros(m.rows, m.cols);
    for (v, d) in m.data.iter_mut().zip(mask.data.iter_mut()) {
        if *v > 0.0 {
            *d = 1.0;
        } else {
            *v = 0.0;
        }
    }
    mask
}

/// Element-wise (Hadamard) product of two same-shape matrices.
pub fn hadamard(a: &Matrix, b: &Matrix) -> Matrix {
    assert_eq!(a.rows, b.rows);
    assert_eq!(a.cols, b.cols);
    Matrix {
        rows: a.rows,
        cols: a.cols,
        data: a.data.iter().zip(&b.data).map(|(x, y)| x * y).collect(),
    }
}

/// Zero-pads or truncates each row to `width` features.
fn resize_features(x: &Matrix, width: usize) -> Matrix {
    if x.cols == width {
        return x.clone();
    }
    let keep = x.cols.min(width);
    let mut out = Matrix::zeros(x.rows, width);
    for r in 0..x.rows {
        out.row_mut(r)[..keep].copy_from_slice(&x.row(r)[..keep]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_block_pads_shortcut() {
        let mut block = ResidualBlock::basic(3, 5, &mut rand::thread_rng());
        let x = Matrix::from_vec(4, 3, (0..12).map(|v| v as f32 * 0.1).collect());
        let y = block.forward(&x, true);
        assert_eq!((y.rows, y.cols), (4, 5));
        assert!(y.data.iter().all(|&v| v >= 0.0));

        let dx = block.backward(&Matrix::filled(4, 5, 1.0));
        assert_eq!((dx.rows, dx.cols), (4, 3));
        assert!(block.params_mut().iter().any(|p| p.grad.data.iter().any(|&g| g != 0.0)));
    }

    #[test]
    fn bottleneck_expands_four_times() {
        let block = ResidualBlock::bottleneck(16, 8, &mut rand::thread_rng());
        assert_eq!(block.out_width, 32);
        assert_eq!(block.stages.len(), 3);
    }

    #[test]
    fn resize_truncates_and_pads() {
        let x = Matrix::from_vec(1, 3, vec![1.0, 2.0, 3.0]);
        assert_eq!(resize_features(&x, 2).data, vec![1.0, 2.0]);
        assert_eq!(resize_features(&x, 4).data, vec![1.0, 2.0, 3.0, 0.0]);
    }
}
