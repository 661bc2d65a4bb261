use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};

/// Width of the stem and of the first ResNet stage.
pub const BASE_WIDTH: usize = 16;

/// Network family named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetType {
    ResNet,
    PyramidNet,
}

impl FromStr for NetType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "resnet"     => Ok(NetType::ResNet),
            "pyramidnet" => Ok(NetType::PyramidNet),
            _ => Err(Error::config(format!("unknown network architecture: {}", s))),
        }
    }
}

/// Shape of a residual classifier.
///
/// - `ResNet`     — three stages of widths 16/32/64, `(depth − 2) / 6` basic
///                  blocks per stage (`/ 9` bottleneck blocks, 4× expansion).
/// - `PyramidNet` — same block count, but the width grows by
///                  `alpha / (3·n)` after every block, starting from 16.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "net_type", rename_all = "snake_case")]
pub enum Architecture {
    ResNet { depth: usize, bottleneck: bool },
    PyramidNet { depth: usize, alpha: f64, bottleneck: bool },
}

/// Per-block plan: input width and the block's inner ("planes") width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPlan {
    pub in_width: usize,
    pub planes: usize,
    pub bottleneck: bool,
}

impl BlockPlan {
    pub fn out_width(&self) -> usize {
        if self.bottleneck { self.planes * 4 } else { self.planes }
    }
}

impl Architecture {
    pub fn new(net_type: NetType, depth: usize, alpha: f64, bottleneck: bool) -> Architecture {
        match net_type {
            NetType::ResNet => Architecture::ResNet { depth, bottleneck },
            NetType::PyramidNet => Architecture::PyramidNet { depth, alpha, bottleneck },
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Architecture::ResNet { .. } => "resnet",
            Architecture::PyramidNet { .. } => "pyramidnet",
        }
    }

    fn blocks_per_stage(depth: usize, bottleneck: bool) -> usize {
        let per_block = if bottleneck { 9 } else { 6 };
        depth.saturating_sub(2) / per_block
    }

    /// Lays out every residual block in order.
    pub fn plan(&self) -> Result<Vec<BlockPlan>> {
        let (depth, bottleneck) = match *self {
            Architecture::ResNet { depth, bottleneck } => (depth, bottleneck),
            Architecture::PyramidNet { depth, bottleneck, .. } => (depth, bottleneck),
        };
        let n = Self::blocks_per_stage(depth, bottleneck);
        if n == 0 {
            let min = if bottleneck { 11 } else { 8 };
            return Err(Error::config(format!(
                "depth {} is too shallow for {} (need at least {})",
                depth, self.tag(), min
            )));
        }

        let mut plan = Vec::with_capacity(3 * n);
        let mut in_width = BASE_WIDTH;
        match *self {
            Architecture::ResNet { .. } => {
                for planes in [BASE_WIDTH, BASE_WIDTH * 2, BASE_WIDTH * 4] {
                    for _ in 0..n {
                        let block = BlockPlan { in_width, planes, bottleneck };
                        in_width = block.out_width();
                        plan.push(block);
                    }
                }
            }
            Architecture::PyramidNet { alpha, .. } => {
                let add_rate = alpha / (3 * n) as f64;
                let mut featuremap_dim = BASE_WIDTH as f64;
                for _ in 0..3 * n {
                    featuremap_dim += add_rate;
                    let planes = (featuremap_dim.round() as usize).max(1);
                    let block = BlockPlan { in_width, planes, bottleneck };
                    in_width = block.out_width();
                    plan.push(block);
                }
            }
        }
        Ok(plan)
    }
}
