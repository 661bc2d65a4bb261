//! Readers for the CIFAR-10 / CIFAR-100 binary distributions.
//!
//! # CIFAR-10 record layout (`cifar-10-batches-bin/*.bin`)
//! ```text
//! byte  0:        label, 0..10
//! bytes 1..3073:  1024 red, 1024 green, 1024 blue values, row-major 32×32
//! ```
//!
//! # CIFAR-100 record layout (`cifar-100-binary/{train,test}.bin`)
//! ```text
//! byte  0:        coarse label, 0..20 (ignored)
//! byte  1:        fine label, 0..100
//! bytes 2..3074:  pixels, same layout as CIFAR-10
//! ```
//!
//! The pixel layout is already CHW, so a record maps straight onto one
//! sample of an `ImageBatch`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::data::{Dataset, DatasetKind};
use crate::error::{Error, Result};

const SIDE: usize = 32;
const CHANNELS: usize = 3;
const PIXELS: usize = CHANNELS * SIDE * SIDE;

#[derive(Debug, Clone)]
pub struct CifarDataset {
    pixels: Vec<u8>,
    labels: Vec<u8>,
    num_classes: usize,
}

/// Byte layout of one record: number of label bytes and which one to use.
#[derive(Debug, Clone, Copy)]
struct RecordFormat {
    label_bytes: usize,
    label_offset: usize,
    num_classes: usize,
}

impl RecordFormat {
    fn for_kind(kind: DatasetKind) -> Result<RecordFormat> {
        match kind {
            DatasetKind::Cifar10 => Ok(RecordFormat { label_bytes: 1, label_offset: 0, num_classes: 10 }),
            DatasetKind::Cifar100 => Ok(RecordFormat { label_bytes: 2, label_offset: 1, num_classes: 100 }),
            DatasetKind::ImageNet => Err(Error::config("imagenet is not a CIFAR dataset")),
        }
    }

    fn record_len(&self) -> usize {
        self.label_bytes + PIXELS
    }
}

impl CifarDataset {
    /// Files making up one split, relative to `data_dir`.
    pub fn split_files(data_dir: &Path, kind: DatasetKind, train: bool) -> Vec<PathBuf> {
        match kind {
            DatasetKind::Cifar100 => {
                let dir = data_dir.join("cifar-100-binary");
                vec![dir.join(if train { "train.bin" } else { "test.bin" })]
            }
            _ => {
                let dir = data_dir.join("cifar-10-batches-bin");
                if train {
                    (1..=5).map(|i| dir.join(format!("data_batch_{}.bin", i))).collect()
                } else {
                    vec![dir.join("test_batch.bin")]
                }
            }
        }
    }

    /// Reads the training or test split of `kind` from `data_dir`.
    pub fn open(data_dir: &Path, kind: DatasetKind, train: bool) -> Result<CifarDataset> {
        let files = Self::split_files(data_dir, kind, train);
        let mut bytes = Vec::new();
        for file in &files {
            let chunk = fs::read(file).map_err(|e| {
                Error::dataset(format!("cannot read {}: {}", file.display(), e))
            })?;
            debug!(file = %file.display(), bytes = chunk.len(), "read CIFAR file");
            bytes.extend_from_slice(&chunk);
        }
        Self::from_bytes(&bytes, kind)
    }

    /// Parses concatenated binary records.
    pub fn from_bytes(bytes: &[u8], kind: DatasetKind) -> Result<CifarDataset> {
        let format = RecordFormat::for_kind(kind)?;
        let record_len = format.record_len();

        if bytes.len() % record_len != 0 {
            return Err(Error::dataset(format!(
                "CIFAR data is {} bytes, not a whole number of {}-byte records",
                bytes.len(),
                record_len
            )));
        }

        let n = bytes.len() / record_len;
        let mut pixels = Vec::with_capacity(n * PIXELS);
        let mut labels = Vec::with_capacity(n);

        for (i, record) in bytes.chunks_exact(record_len).enumerate() {
            let label = record[format.label_offset];
            if label as usize >= format.num_classes {
                return Err(Error::dataset(format!(
                    "record {}: label {} out of range for {} classes",
                    i, label, format.num_classes
                )));
            }
            labels.push(label);
            pixels.extend_from_slice(&record[format.label_bytes..]);
        }

        Ok(CifarDataset { pixels, labels, num_classes: format.num_classes })
    }
}

impl Dataset for CifarDataset {
    fn len(&self) -> usize {
        self.labels.len()
    }

    fn shape(&self) -> (usize, usize, usize) {
        (CHANNELS, SIDE, SIDE)
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn load(&self, index: usize, out: &mut [f32]) -> Result<usize> {
        let src = &self.pixels[index * PIXELS..(index + 1) * PIXELS];
        for (o, &p) in out.iter_mut().zip(src) {
            *o = p as f32 / 255.0;
        }
        Ok(self.labels[index] as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(labels: &[u8], fill: u8) -> Vec<u8> {
        let mut r = labels.to_vec();
        r.extend(std::iter::repeat(fill).take(PIXELS));
        r
    }

    #[test]
    fn parses_cifar10_records() {
        let mut bytes = record(&[3], 255);
        bytes.extend(record(&[7], 0));
        let ds = CifarDataset::from_bytes(&bytes, DatasetKind::Cifar10).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.shape(), (3, 32, 32));

        let mut out = vec![0.0; PIXELS];
        assert_eq!(ds.load(0, &mut out).unwrap(), 3);
        assert!(out.iter().all(|&v| v == 1.0));
        assert_eq!(ds.load(1, &mut out).unwrap(), 7);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn cifar100_uses_fine_label() {
        let bytes = record(&[4, 42], 51);
        let ds = CifarDataset::from_bytes(&bytes, DatasetKind::Cifar100).unwrap();
        let mut out = vec![0.0; PIXELS];
        assert_eq!(ds.load(0, &mut out).unwrap(), 42);
        assert!((out[0] - 0.2).abs() < 1e-6);
        assert_eq!(ds.num_classes(), 100);
    }

    #[test]
    fn rejects_truncated_and_out_of_range_data() {
        let mut bytes = record(&[1], 0);
        bytes.pop();
        assert!(matches!(CifarDataset::from_bytes(&bytes, DatasetKind::Cifar10), Err(Error::Dataset(_))));
        let bytes = record(&[10], 0);
        assert!(matches!(CifarDataset::from_bytes(&bytes, DatasetKind::Cifar10), Err(Error::Dataset(_))));
    }

    #[test]
    fn reads_split_files_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cifar-10-batches-bin");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("test_batch.bin"), record(&[5], 10)).unwrap();
        let ds = CifarDataset::open(dir.path(), DatasetKind::Cifar10, false).unwrap();
        assert_eq!(ds.len(), 1);
        assert!(matches!(
            CifarDataset::open(dir.path(), DatasetKind::Cifar10, true),
            Err(Error::Dataset(_))
        ));
    }
}
