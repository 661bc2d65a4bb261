use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

/// Running value/average pair for one training metric.
///
/// `update(value, n)` weights `value` by `n` (the batch size), so `avg` is
/// the per-sample mean over everything seen since the last `reset`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AverageMeter {
    pub val: f64,
    pub avg: f64,
    pub sum: f64,
    pub count: f64,
}

impl AverageMeter {
    pub fn new() -> AverageMeter {
        AverageMeter::default()
    }

    pub fn reset(&mut self) {
        *self = AverageMeter::default();
    }

    pub fn update(&mut self, value: f64, n: usize) {
        self.val = value;
        self.sum += value * n as f64;
        self.count += n as f64;
        if self.count > 0.0 {
            self.avg = self.sum / self.count;
        }
    }
}

/// Top-k error rates, in percent, for each `k` in `ks`.
///
/// A sample's rank is the number of classes scoring higher than its label,
/// plus the lower-indexed classes that tie with it. It counts as correct for
/// `k` when its rank is below `k`. Rows holding a NaN or infinite score are
/// wrong for every `k`. `k` is clamped to the number of classes.
pub fn top_k_errors(logits: &Matrix, labels: &[usize], ks: &[usize]) -> Vec<f64> {
    let n = labels.len();
    if n == 0 {
        return vec![0.0; ks.len()];
    }

    let ranks: Vec<usize> = labels.iter().enumerate()
        .map(|(i, &label)| {
            let row = logits.row(i);
            if row.iter().any(|v| !v.is_finite()) {
                return usize::MAX;
            }
            let target = row[label];
            row.iter()
                .enumerate()
                .filter(|&(j, &v)| v > target || (v == target && j < label))
                .count()
        })
        .collect();

    ks.iter()
        .map(|&k| {
            let k = k.min(logits.cols);
            let wrong = ranks.iter().filter(|&&r| r >= k).count();
            wrong as f64 * 100.0 / n as f64
        })
        .collect()
}
