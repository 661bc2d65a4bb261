use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::layers::block::{hadamard, relu_in_place, ResidualBlock, Stage};
use crate::layers::dense::Dense;
use crate::math::image_batch::ImageBatch;
use crate::math::matrix::Matrix;
use crate::network::architecture::{Architecture, BASE_WIDTH};
use crate::network::model::{Model, Param};

/// Residual classifier over flattened images.
///
/// `stem → residual blocks → head`, where the stem is a dense + batch-norm
/// stage with ReLU and the head is a plain dense layer producing logits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub arch: String,
    pub stem: Stage,
    pub blocks: Vec<ResidualBlock>,
    pub head: Dense,
    #[serde(skip)]
    training: bool,
    #[serde(skip)]
    stem_mask: Matrix,
}

impl Network {
    /// Builds a network for inputs of `input_features` values and
    /// `num_classes` outputs.
    pub fn new(architecture: &Architecture, input_features: usize, num_classes: usize) -> Result<Network> {
        Network::with_rng(architecture, input_features, num_classes, &mut rand::thread_rng())
    }

    /// [`Network::new`] with every weight drawn from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(
        architecture: &Architecture,
        input_features: usize,
        num_classes: usize,
        rng: &mut R,
    ) -> Result<Network> {
        let plan = architecture.plan()?;
        let stem = Stage::new(input_features, BASE_WIDTH, rng);
        let blocks: Vec<ResidualBlock> = plan
            .into_iter()
            .map(|b| {
                if b.bottleneck {
                    ResidualBlock::bottleneck(b.in_width, b.planes, rng)
                } else {
                    ResidualBlock::basic(b.in_width, b.planes, rng)
                }
            })
            .collect();
        let final_width = blocks.last().map(|b| b.out_width).unwrap_or(BASE_WIDTH);

        Ok(Network {
            arch: architecture.tag().to_string(),
            stem,
            blocks,
            head: Dense::with_rng(final_width, num_classes, rng),
            training: true,
            stem_mask: Matrix::default(),
        })
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    pub fn num_parameters(&mut self) -> usize {
        self.params_mut().iter().map(|p| p.len()).sum()
    }
}

impl Model for Network {
    fn forward(&mut self, images: &ImageBatch) -> Matrix {
        let training = self.training;
        let mut h = self.stem.forward(&images.to_matrix(), training);
        let mask = relu_in_place(&mut h);
        if training {
            self.stem_mask = mask;
        }
        for block in &mut self.blocks {
            h = block.forward(&h, training);
        }
        self.head.forward(&h, training)
    }

    fn backward(&mut self, grad_logits: &Matrix) {
        let mut g = self.head.backward(grad_logits);
        for block in self.blocks.iter_mut().rev() {
            g = block.backward(&g);
        }
        let g = hadamard(&g, &self.stem_mask);
        self.stem.backward_params(&g);
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        let mut params = self.stem.params_mut();
        for block in &mut self.blocks {
            params.extend(block.params_mut());
        }
        params.extend(self.head.params_mut());
        params
    }

    fn arch(&self) -> &str {
        &self.arch
    }
}
