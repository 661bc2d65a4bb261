//! Command-line configuration.
//!
//! ```bash
//! ferrite-mix --dataset cifar10 --net_type resnet --depth 20 --no-bottleneck
//! ferrite-mix --process cutmix --beta 1.0 --cutmix_prob 0.5 --expname cutmix_r20
//! ferrite-mix --expname cutmix_r20 --resume
//! ```

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use tracing::warn;
use serde::{Serialize, Deserialize};

use crate::augment::strategy::{AugmentParams, Augmentation};
use crate::data::DatasetKind;
use crate::error::{Error, Result};
use crate::network::architecture::{Architecture, NetType};

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "ferrite-mix", about = "Train a residual classifier with mixed-sample data augmentation")]
pub struct Args {
    /// Network type: resnet or pyramidnet
    #[arg(long = "net_type", default_value = "pyramidnet")]
    pub net_type: String,

    /// Number of data loading workers
    #[arg(short = 'j', long, default_value_t = 4)]
    pub workers: usize,

    /// Number of total epochs to run
    #[arg(long, default_value_t = 90)]
    pub epochs: usize,

    /// Mini-batch size
    #[arg(short = 'b', long = "batch_size", default_value_t = 128)]
    pub batch_size: usize,

    /// Initial learning rate
    #[arg(long, visible_alias = "learning-rate", default_value_t = 0.1)]
    pub lr: f64,

    #[arg(long, default_value_t = 0.9)]
    pub momentum: f64,

    #[arg(long = "weight-decay", visible_alias = "wd", default_value_t = 1e-4)]
    pub weight_decay: f64,

    /// Print frequency in batches
    #[arg(short = 'p', long = "print-freq", default_value_t = 100)]
    pub print_freq: usize,

    /// Depth of the network
    #[arg(long, default_value_t = 32)]
    pub depth: usize,

    /// Use basic blocks instead of bottleneck blocks
    #[arg(long = "no-bottleneck", action = ArgAction::SetFalse)]
    pub bottleneck: bool,

    /// Dataset: cifar10, cifar100 or imagenet
    #[arg(long, default_value = "cifar100")]
    pub dataset: String,

    /// Disable the per-batch status lines
    #[arg(long = "no-verbose", action = ArgAction::SetFalse)]
    pub verbose: bool,

    /// Total channel increase across a PyramidNet
    #[arg(long, default_value_t = 300.0)]
    pub alpha: f64,

    /// Experiment name, used as the checkpoint namespace
    #[arg(long, default_value = "TEST")]
    pub expname: String,

    /// Beta distribution parameter of the box-based strategies
    #[arg(long, default_value_t = 0.0)]
    pub beta: f64,

    /// Augmentation: None, cutout, mixup, cutmix, cutmixup, divmix, aroundmix, fademixup, softcutout
    #[arg(long, default_value = "None")]
    pub process: String,

    #[arg(long = "cutout_prob", default_value_t = 0.0)]
    pub cutout_prob: f64,

    #[arg(long = "cutout_n_holes", default_value_t = 1)]
    pub cutout_n_holes: usize,

    #[arg(long = "cutout_length", default_value_t = 16)]
    pub cutout_length: usize,

    #[arg(long = "mixup_alpha", default_value_t = 1.0)]
    pub mixup_alpha: f64,

    #[arg(long = "cutmix_prob", default_value_t = 0.0)]
    pub cutmix_prob: f64,

    #[arg(long = "divmix_prob", default_value_t = 0.0)]
    pub divmix_prob: f64,

    #[arg(long = "cutmixup_alpha", default_value_t = 1.0)]
    pub cutmixup_alpha: f64,

    #[arg(long = "cutmixup_prob", default_value_t = 0.0)]
    pub cutmixup_prob: f64,

    #[arg(long = "aroundmix_alpha", default_value_t = 1.0)]
    pub aroundmix_alpha: f64,

    #[arg(long = "aroundmix_prob", default_value_t = 0.0)]
    pub aroundmix_prob: f64,

    #[arg(long = "fademixup_alpha", default_value_t = 1.0)]
    pub fademixup_alpha: f64,

    /// Accepted for older launch scripts; fademixup runs on every batch
    #[arg(long = "fademixup_prob", default_value_t = 0.0)]
    pub fademixup_prob: f64,

    #[arg(long = "softcutout_prob", default_value_t = 0.0)]
    pub softcutout_prob: f64,

    #[arg(long = "softcutout_n_holes", default_value_t = 1)]
    pub softcutout_n_holes: usize,

    #[arg(long = "softcutout_length", default_value_t = 16)]
    pub softcutout_length: usize,

    /// Soft-cutout strength: hole pixels are scaled by `alpha`, so 0 erases them
    #[arg(long = "softcutout_alpha", default_value_t = 1.0)]
    pub softcutout_alpha: f64,

    /// Directory holding the datasets
    #[arg(long = "data-dir", default_value = "../data")]
    pub data_dir: PathBuf,

    /// Directory holding per-experiment checkpoints
    #[arg(long = "runs-dir", default_value = "runs")]
    pub runs_dir: PathBuf,

    /// Side length images are resized to for folder datasets
    #[arg(long = "image-size", default_value_t = 224)]
    pub image_size: u32,

    /// Seed for weight initialization, augmentation and shuffling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Continue from the experiment's latest checkpoint
    #[arg(long)]
    pub resume: bool,
}

impl Args {
    pub fn augment_params(&self) -> AugmentParams {
        AugmentParams {
            beta: self.beta,
            cutout_prob: self.cutout_prob,
            cutout_n_holes: self.cutout_n_holes,
            cutout_length: self.cutout_length,
            mixup_alpha: self.mixup_alpha,
            cutmix_prob: self.cutmix_prob,
            divmix_prob: self.divmix_prob,
            cutmixup_alpha: self.cutmixup_alpha,
            cutmixup_prob: self.cutmixup_prob,
            aroundmix_alpha: self.aroundmix_alpha,
            aroundmix_prob: self.aroundmix_prob,
            fademixup_alpha: self.fademixup_alpha,
            softcutout_prob: self.softcutout_prob,
            softcutout_n_holes: self.softcutout_n_holes,
            softcutout_length: self.softcutout_length,
            softcutout_alpha: self.softcutout_alpha,
        }
    }

    pub fn augmentation(&self) -> Result<Augmentation> {
        Augmentation::select(&self.process, &self.augment_params())
    }

    pub fn dataset_kind(&self) -> Result<DatasetKind> {
        self.dataset.parse()
    }

    /// The configured architecture, checked to contain at least one block.
    pub fn architecture(&self) -> Result<Architecture> {
        let net_type: NetType = self.net_type.parse()?;
        let arch = Architecture::new(net_type, self.depth, self.alpha, self.bottleneck);
        arch.plan()?;
        Ok(arch)
    }

    /// Checks every setting that would otherwise fail mid-run.
    pub fn validate(&self) -> Result<()> {
        self.dataset_kind()?;
        self.architecture()?;
        self.augmentation()?;
        if self.batch_size == 0 {
            return Err(Error::config("batch size must be at least 1"));
        }
        if self.expname.is_empty() {
            return Err(Error::config("experiment name must not be empty"));
        }
        if self.fademixup_prob != 0.0 {
            warn!(fademixup_prob = self.fademixup_prob, "--fademixup_prob is ignored");
        }
        Ok(())
    }
}
