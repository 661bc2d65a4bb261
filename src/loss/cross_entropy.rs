use crate::math::matrix::Matrix;

/// Categorical cross-entropy over raw logits with integer class targets.
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// Row-wise log-softmax, shifted by the row maximum for stability.
    pub fn log_softmax(logits: &Matrix) -> Matrix {
        let mut out = logits.clone();
        for r in 0..out.rows {
            let row = out.row_mut(r);
            let max = row.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            let log_sum = row.iter().map(|&z| (z - max).exp()).sum::<f32>().ln() + max;
            for z in row.iter_mut() {
                *z -= log_sum;
            }
        }
        out
    }

    /// Mean negative log-likelihood of `labels` under precomputed log-probabilities.
    pub fn loss_from_log_probs(log_probs: &Matrix, labels: &[usize]) -> f32 {
        if labels.is_empty() {
            return 0.0;
        }
        let total: f32 = labels.iter().enumerate()
            .map(|(i, &label)| -log_probs.get(i, label))
            .sum();
        total / labels.len() as f32
    }

    /// Scalar loss: `mean_i(-log softmax(logits_i)[label_i])`.
    pub fn loss(logits: &Matrix, labels: &[usize]) -> f32 {
        Self::loss_from_log_probs(&Self::log_softmax(logits), labels)
    }

    /// Adds `weight · ∂L/∂logits` into `grad`.
    ///
    /// For softmax composed with cross-entropy the gradient of the batch mean
    /// is `(softmax(z) - onehot(label)) / N`.
    pub fn accumulate_derivative(probs: &Matrix, labels: &[usize], weight: f32, grad: &mut Matrix) {
        let n = labels.len();
        if n == 0 || weight == 0.0 {
            return;
        }
        let scale = weight / n as f32;
        for (i, &label) in labels.iter().enumerate() {
            let p = probs.row(i);
            let g = grad.row_mut(i);
            for (j, (gj, pj)) in g.iter_mut().zip(p).enumerate() {
                let target = if j == label { 1.0 } else { 0.0 };
                *gj += scale * (pj - target);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_logits_give_log_k() {
        let logits = Matrix::zeros(2, 4);
        let loss = CrossEntropyLoss::loss(&logits, &[0, 3]);
        assert!((loss - 4f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn confident_correct_prediction_has_low_loss() {
        let logits = Matrix::from_vec(1, 3, vec![10.0, 0.0, 0.0]);
        assert!(CrossEntropyLoss::loss(&logits, &[0]) < 1e-3);
        assert!(CrossEntropyLoss::loss(&logits, &[1]) > 9.0);
    }

    #[test]
    fn derivative_rows_sum_to_zero() {
        let logits = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, -1.0, 0.5, 0.0]);
        let probs = CrossEntropyLoss::log_softmax(&logits).map(f32::exp);
        let mut grad = Matrix::zeros(2, 3);
        CrossEntropyLoss::accumulate_derivative(&probs, &[2, 0], 1.0, &mut grad);
        for r in 0..2 {
            assert!(grad.row(r).iter().sum::<f32>().abs() < 1e-6);
        }
        assert!(grad.get(0, 2) < 0.0);
        assert!(grad.get(1, 0) < 0.0);
    }
}
