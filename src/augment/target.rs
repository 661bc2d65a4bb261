use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::math::matrix::Matrix;

/// One label batch and the weight its cross-entropy term carries.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedLabels {
    pub labels: Vec<usize>,
    pub weight: f64,
}

/// Ordered list of `(labels, weight)` pairs produced by an augmentation.
///
/// The composite loss is `Σ weight_i · CE(logits, labels_i)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MixedTarget {
    pub parts: Vec<WeightedLabels>,
}

impl MixedTarget {
    /// The unperturbed target: the batch's own labels with weight 1.
    pub fn single(labels: Vec<usize>) -> MixedTarget {
        MixedTarget { parts: vec![WeightedLabels { labels, weight: 1.0 }] }
    }

    pub fn pair(a: Vec<usize>, weight_a: f64, b: Vec<usize>, weight_b: f64) -> MixedTarget {
        MixedTarget {
            parts: vec![
                WeightedLabels { labels: a, weight: weight_a },
                WeightedLabels { labels: b, weight: weight_b },
            ],
        }
    }

    pub fn weighted(parts: Vec<(Vec<usize>, f64)>) -> MixedTarget {
        MixedTarget {
            parts: parts.into_iter()
                .map(|(labels, weight)| WeightedLabels { labels, weight })
                .collect(),
        }
    }

    /// Labels of the first pair: the batch's own labels, used for error metrics.
    pub fn primary(&self) -> &[usize] {
        self.parts.first().map(|p| p.labels.as_slice()).unwrap_or(&[])
    }

    pub fn total_weight(&self) -> f64 {
        self.parts.iter().map(|p| p.weight).sum()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.parts.iter().map(|p| p.weight).collect()
    }

    /// Composite loss only.
    pub fn loss(&self, logits: &Matrix) -> f32 {
        let log_probs = CrossEntropyLoss::log_softmax(logits);
        self.parts.iter()
            .map(|p| p.weight as f32 * CrossEntropyLoss::loss_from_log_probs(&log_probs, &p.labels))
            .sum()
    }

    /// Composite loss and its gradient with respect to `logits`.
    pub fn loss_and_grad(&self, logits: &Matrix) -> (f32, Matrix) {
        let log_probs = CrossEntropyLoss::log_softmax(logits);
        let probs = log_probs.map(f32::exp);
        let mut grad = Matrix::zeros(logits.rows, logits.cols);
        let mut loss = 0.0;
        for part in &self.parts {
            let w = part.weight as f32;
            loss += w * CrossEntropyLoss::loss_from_log_probs(&log_probs, &part.labels);
            CrossEntropyLoss::accumulate_derivative(&probs, &part.labels, w, &mut grad);
        }
        (loss, grad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_loss_is_weighted_sum() {
        let logits = Matrix::from_vec(2, 3, vec![2.0, 0.5, -1.0, 0.0, 1.0, 0.3]);
        let a = vec![0, 1];
        let b = vec![2, 2];
        let target = MixedTarget::pair(a.clone(), 0.3, b.clone(), 0.7);
        let expected = 0.3 * CrossEntropyLoss::loss(&logits, &a) + 0.7 * CrossEntropyLoss::loss(&logits, &b);
        assert!((target.loss(&logits) - expected).abs() < 1e-5);
        let (loss, grad) = target.loss_and_grad(&logits);
        assert!((loss - expected).abs() < 1e-5);
        assert_eq!((grad.rows, grad.cols), (2, 3));
    }

    #[test]
    fn single_target_matches_plain_cross_entropy() {
        let logits = Matrix::from_vec(1, 2, vec![0.2, 0.9]);
        let target = MixedTarget::single(vec![1]);
        assert_eq!(target.weights(), vec![1.0]);
        assert_eq!(target.primary(), &[1]);
        assert!((target.loss(&logits) - CrossEntropyLoss::loss(&logits, &[1])).abs() < 1e-7);
    }

    #[test]
    fn zero_weight_part_contributes_nothing() {
        let logits = Matrix::from_vec(1, 2, vec![0.2, 0.9]);
        let with_zero = MixedTarget::pair(vec![1], 1.0, vec![0], 0.0);
        let (l1, g1) = with_zero.loss_and_grad(&logits);
        let (l2, g2) = MixedTarget::single(vec![1]).loss_and_grad(&logits);
        assert_eq!(l1, l2);
        assert_eq!(g1, g2);
    }
}
