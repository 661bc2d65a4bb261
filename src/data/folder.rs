//! Image-folder dataset: `root/<class>/<image>`.
//!
//! Class indices follow the sorted order of the class directory names.
//! Images (PNG/JPEG/BMP/GIF) are decoded on demand, resized to
//! `size × size`, and flattened as CHW with pixel values in `[0, 1]`.

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use tracing::debug;

use crate::data::Dataset;
use crate::error::{Error, Result};

const EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

#[derive(Debug, Clone)]
pub struct ImageFolder {
    classes: Vec<String>,
    samples: Vec<(PathBuf, usize)>,
    size: u32,
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| Error::dataset(format!("cannot read {}: {}", dir.display(), e)))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

impl ImageFolder {
    pub fn open(root: &Path, size: u32) -> Result<ImageFolder> {
        if size == 0 {
            return Err(Error::config("image size must be positive"));
        }

        let class_dirs: Vec<PathBuf> = sorted_entries(root)?
            .into_iter()
            .filter(|p| p.is_dir())
            .collect();
        if class_dirs.is_empty() {
            return Err(Error::dataset(format!("no class directories under {}", root.display())));
        }

        let mut classes = Vec::with_capacity(class_dirs.len());
        let mut samples = Vec::new();
        for (label, dir) in class_dirs.iter().enumerate() {
            let name = dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let before = samples.len();
            for file in sorted_entries(dir)? {
                if file.is_file() && is_image(&file) {
                    samples.push((file, label));
                }
            }
            debug!(class = %name, label, images = samples.len() - before, "indexed class");
            classes.push(name);
        }

        Ok(ImageFolder { classes, samples, size })
    }

    /// Class names in label order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

impl Dataset for ImageFolder {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn shape(&self) -> (usize, usize, usize) {
        (3, self.size as usize, self.size as usize)
    }

    fn num_classes(&self) -> usize {
        self.classes.len()
    }

    fn load(&self, index: usize, out: &mut [f32]) -> Result<usize> {
        let (path, label) = &self.samples[index];
        let img = image::open(path)?;
        let rgb = img.resize_exact(self.size, self.size, FilterType::Triangle).to_rgb8();

        let plane = (self.size * self.size) as usize;
        for (i, pixel) in rgb.pixels().enumerate() {
            for c in 0..3 {
                out[c * plane + i] = pixel.0[c] as f32 / 255.0;
            }
        }
        Ok(*label)
    }
}
