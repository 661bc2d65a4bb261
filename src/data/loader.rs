use std::thread;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::augment::random::StdRandom;
use crate::data::{Dataset, Transform};
use crate::error::{Error, Result};
use crate::math::image_batch::{Batch, ImageBatch};

/// Mini-batch iterator over a `Dataset`.
///
/// Each call to [`DataLoader::epoch`] starts a fresh pass; with shuffling
/// enabled the sample order is redrawn every time. The last batch of an
/// epoch may be short.
///
/// Batches are assembled on the calling thread, or split across `workers`
/// scoped threads when more than one worker is configured. Every worker
/// gets its own transform RNG seeded from the loader's generator, so a
/// seeded loader produces the same batches regardless of the worker count
/// only when the transform is deterministic.
pub struct DataLoader<D: Dataset> {
    dataset: D,
    batch_size: usize,
    shuffle: bool,
    workers: usize,
    transform: Transform,
    rng: StdRng,
}

impl<D: Dataset> DataLoader<D> {
    pub fn new(dataset: D, batch_size: usize) -> Result<DataLoader<D>> {
        if batch_size == 0 {
            return Err(Error::config("batch size must be at least 1"));
        }
        Ok(DataLoader {
            dataset,
            batch_size,
            shuffle: false,
            workers: 0,
            transform: Transform::identity(),
            rng: StdRng::from_entropy(),
        })
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Number of batches per epoch.
    pub fn len(&self) -> usize {
        (self.dataset.len() + self.batch_size - 1) / self.batch_size
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    /// Starts one pass over the dataset.
    pub fn epoch(&mut self) -> Epoch<'_, D> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            order.shuffle(&mut self.rng);
        }
        let seed = self.rng.gen::<u64>();
        Epoch { loader: self, order, cursor: 0, seed }
    }

    fn assemble(&self, indices: &[usize], seed: u64) -> Result<Batch> {
        let (c, h, w) = self.dataset.shape();
        let sample_len = c * h * w;
        let mut data = vec![0.0f32; indices.len() * sample_len];
        let mut labels = vec![0usize; indices.len()];

        let workers = self.workers.max(1).min(indices.len().max(1));
        if workers == 1 {
            fill(&self.dataset, &self.transform, indices, &mut data, &mut labels, seed)?;
        } else {
            let per_worker = (indices.len() + workers - 1) / workers;
            thread::scope(|scope| -> Result<()> {
                let handles: Vec<_> = indices
                    .chunks(per_worker)
                    .zip(data.chunks_mut(per_worker * sample_len))
                    .zip(labels.chunks_mut(per_worker))
                    .enumerate()
                    .map(|(k, ((idx, out), lab))| {
                        let dataset = &self.dataset;
                        let transform = &self.transform;
                        scope.spawn(move || {
                            fill(dataset, transform, idx, out, lab, seed.wrapping_add(k as u64))
                        })
                    })
                    .collect();
                for handle in handles {
                    handle
                        .join()
                        .map_err(|_| Error::dataset("data loader worker panicked"))??;
                }
                Ok(())
            })?;
        }

        let images = ImageBatch::from_vec(indices.len(), c, h, w, data)?;
        Batch::new(images, labels)
    }
}

/// Loads and transforms `indices` into the matching slots of `data`/`labels`.
fn fill<D: Dataset>(
    dataset: &D,
    transform: &Transform,
    indices: &[usize],
    data: &mut [f32],
    labels: &mut [usize],
    seed: u64,
) -> Result<()> {
    let shape = dataset.shape();
    let sample_len = shape.0 * shape.1 * shape.2;
    let mut rng = StdRandom::seeded(seed);
    for ((&index, out), label) in indices.iter().zip(data.chunks_mut(sample_len)).zip(labels.iter_mut()) {
        *label = dataset.load(index, out)?;
        transform.apply(out, shape, &mut rng);
    }
    Ok(())
}

/// One pass over a `DataLoader`, yielding batches in order.
pub struct Epoch<'a, D: Dataset> {
    loader: &'a DataLoader<D>,
    order: Vec<usize>,
    cursor: usize,
    seed: u64,
}

impl<'a, D: Dataset> Iterator for Epoch<'a, D> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.loader.batch_size).min(self.order.len());
        let batch_index = (self.cursor / self.loader.batch_size) as u64;
        let indices = &self.order[self.cursor..end];
        self.cursor = end;
        trace!(batch = batch_index, size = indices.len(), "assembling batch");
        Some(self.loader.assemble(indices, self.seed ^ batch_index.rotate_left(32)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.order.len() - self.cursor + self.loader.batch_size - 1) / self.loader.batch_size;
        (left, Some(left))
    }
}
