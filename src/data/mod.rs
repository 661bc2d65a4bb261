//! Datasets and mini-batch loading.

pub mod cifar;
pub mod folder;
pub mod loader;
pub mod transform;

use std::path::Path;
use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::optim::schedule::LrFamily;

pub use cifar::CifarDataset;
pub use folder::ImageFolder;
pub use loader::DataLoader;
pub use transform::Transform;

/// Random-access collection of labelled images of one fixed shape.
pub trait Dataset: Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(channels, height, width)` of every sample.
    fn shape(&self) -> (usize, usize, usize);

    fn num_classes(&self) -> usize;

    /// Writes sample `index` into `out` (CHW, values in `[0, 1]`) and returns
    /// its label.
    fn load(&self, index: usize, out: &mut [f32]) -> Result<usize>;
}

impl<T: Dataset + ?Sized> Dataset for Box<T> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn shape(&self) -> (usize, usize, usize) {
        (**self).shape()
    }

    fn num_classes(&self) -> usize {
        (**self).num_classes()
    }

    fn load(&self, index: usize, out: &mut [f32]) -> Result<usize> {
        (**self).load(index, out)
    }
}

/// Dataset named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Cifar10,
    Cifar100,
    ImageNet,
}

impl FromStr for DatasetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cifar10"  => Ok(DatasetKind::Cifar10),
            "cifar100" => Ok(DatasetKind::Cifar100),
            "imagenet" => Ok(DatasetKind::ImageNet),
            _ => Err(Error::config(format!("unknown dataset : {}", s))),
        }
    }
}

impl DatasetKind {
    pub fn num_classes(&self) -> usize {
        match self {
            DatasetKind::Cifar10 => 10,
            DatasetKind::Cifar100 => 100,
            DatasetKind::ImageNet => 1000,
        }
    }

    pub fn lr_family(&self) -> LrFamily {
        match self {
            DatasetKind::Cifar10 | DatasetKind::Cifar100 => LrFamily::EpochFraction,
            DatasetKind::ImageNet => LrFamily::FixedSteps,
        }
    }

    /// Opens the training or held-out split under `data_dir`.
    ///
    /// CIFAR reads the binary distributions; ImageNet expects
    /// `data_dir/imagenet/{train,val}/<class>/<image>` and resizes every image
    /// to `image_size × image_size`.
    pub fn open(&self, data_dir: &Path, image_size: u32, train: bool) -> Result<Box<dyn Dataset>> {
        match self {
            DatasetKind::Cifar10 | DatasetKind::Cifar100 => {
                Ok(Box::new(CifarDataset::open(data_dir, *self, train)?))
            }
            DatasetKind::ImageNet => {
                let split = if train { "train" } else { "val" };
                Ok(Box::new(ImageFolder::open(&data_dir.join("imagenet").join(split), image_size)?))
            }
        }
    }

    pub fn transform(&self, train: bool) -> Transform {
        match (self, train) {
            (DatasetKind::ImageNet, true) => Transform::imagenet_train(),
            (DatasetKind::ImageNet, false) => Transform::imagenet_test(),
            (_, true) => Transform::cifar_train(),
            (_, false) => Transform::cifar_test(),
        }
    }
}

/// Dataset held entirely in memory as `f32` pixels.
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    images: Vec<f32>,
    labels: Vec<usize>,
    shape: (usize, usize, usize),
    num_classes: usize,
}

impl InMemoryDataset {
    pub fn new(
        images: Vec<f32>,
        labels: Vec<usize>,
        shape: (usize, usize, usize),
        num_classes: usize,
    ) -> Result<InMemoryDataset> {
        let sample_len = shape.0 * shape.1 * shape.2;
        if images.len() != labels.len() * sample_len {
            return Err(Error::dataset(format!(
                "{} pixel values do not form {} images of shape {:?}",
                images.len(), labels.len(), shape
            )));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= num_classes) {
            return Err(Error::dataset(format!("label {} out of range for {} classes", bad, num_classes)));
        }
        Ok(InMemoryDataset { images, labels, shape, num_classes })
    }
}

impl Dataset for InMemoryDataset {
    fn len(&self) -> usize {
        self.labels.len()
    }

    fn shape(&self) -> (usize, usize, usize) {
        self.shape
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn load(&self, index: usize, out: &mut [f32]) -> Result<usize> {
        let len = out.len();
        out.copy_from_slice(&self.images[index * len..(index + 1) * len]);
        Ok(self.labels[index])
    }
}
