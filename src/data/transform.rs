use crate::augment::random::RandomSource;

const CIFAR_MEAN: [f32; 3] = [125.3 / 255.0, 123.0 / 255.0, 113.9 / 255.0];
const CIFAR_STD: [f32; 3] = [63.0 / 255.0, 62.1 / 255.0, 66.7 / 255.0];
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Per-sample preprocessing applied by the `DataLoader`.
///
/// Steps run in order: random crop from a zero-padded image (if
/// `crop_padding` is set), random horizontal flip, per-channel
/// normalization. Samples arrive in CHW layout with values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub crop_padding: Option<usize>,
    pub horizontal_flip: bool,
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl Transform {
    /// No-op transform.
    pub fn identity() -> Transform {
        Transform { crop_padding: None, horizontal_flip: false, mean: Vec::new(), std: Vec::new() }
    }

    /// Normalization only.
    pub fn normalize(mean: &[f32], std: &[f32]) -> Transform {
        Transform { crop_padding: None, horizontal_flip: false, mean: mean.to_vec(), std: std.to_vec() }
    }

    pub fn cifar_train() -> Transform {
        Transform { crop_padding: Some(4), horizontal_flip: true, ..Transform::cifar_test() }
    }

    pub fn cifar_test() -> Transform {
        Transform::normalize(&CIFAR_MEAN, &CIFAR_STD)
    }

    pub fn imagenet_train() -> Transform {
        Transform { horizontal_flip: true, ..Transform::imagenet_test() }
    }

    pub fn imagenet_test() -> Transform {
        Transform::normalize(&IMAGENET_MEAN, &IMAGENET_STD)
    }

    /// Transforms one `c × h × w` sample in place.
    pub fn apply(&self, sample: &mut [f32], shape: (usize, usize, usize), rng: &mut dyn RandomSource) {
        let (c, h, w) = shape;

        if let Some(pad) = self.crop_padding.filter(|&p| p > 0) {
            let dy = rng.below(2 * pad + 1) as isize - pad as isize;
            let dx = rng.below(2 * pad + 1) as isize - pad as isize;
            shift(sample, shape, dy, dx);
        }

        if self.horizontal_flip && rng.uniform() < 0.5 {
            for row in sample.chunks_mut(w).take(c * h) {
                row.reverse();
            }
        }

        let plane = h * w;
        for (ch, channel) in sample.chunks_mut(plane).enumerate() {
            let (Some(&m), Some(&s)) = (self.mean.get(ch), self.std.get(ch)) else {
                continue;
            };
            for v in channel.iter_mut() {
                *v = (*v - m) / s;
            }
        }
    }
}

/// Crop of the zero-padded image whose top-left corner is offset by
/// `(dy, dx)` from the original: `out[y][x] = in[y + dy][x + dx]`, zero
/// outside the image.
fn shift(sample: &mut [f32], (c, h, w): (usize, usize, usize), dy: isize, dx: isize) {
    if dy == 0 && dx == 0 {
        return;
    }
    let source = sample.to_vec();
    for ch in 0..c {
        for y in 0..h {
            for x in 0..w {
                let sy = y as isize + dy;
                let sx = x as isize + dx;
                let inside = sy >= 0 && sx >= 0 && (sy as usize) < h && (sx as usize) < w;
                sample[(ch * h + y) * w + x] = if inside {
                    source[(ch * h + sy as usize) * w + sx as usize]
                } else {
                    0.0
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::random::ScriptedRandom;

    #[test]
    fn normalizes_each_channel() {
        let t = Transform::normalize(&[0.5, 0.0], &[0.5, 2.0]);
        let mut sample = vec![1.0, 0.0, 1.0, 4.0];
        t.apply(&mut sample, (2, 1, 2), &mut ScriptedRandom::default());
        assert_eq!(sample, vec![1.0, -1.0, 0.5, 2.0]);
    }

    #[test]
    fn flip_reverses_rows() {
        let t = Transform { horizontal_flip: true, ..Transform::identity() };
        let mut sample = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        t.apply(&mut sample, (1, 2, 3), &mut ScriptedRandom::default().with_uniforms(vec![0.1]));
        assert_eq!(sample, vec![3.0, 2.0, 1.0, 6.0, 5.0, 4.0]);

        let mut sample = vec![1.0, 2.0, 3.0];
        t.apply(&mut sample, (1, 1, 3), &mut ScriptedRandom::default().with_uniforms(vec![0.9]));
        assert_eq!(sample, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn padded_crop_shifts_and_fills_zero() {
        let t = Transform { crop_padding: Some(1), ..Transform::identity() };
        let mut sample = vec![1.0, 2.0, 3.0, 4.0];
        // dy = 2 - 1 = 1, dx = 0 - 1 = -1
        let mut rng = ScriptedRandom::default().with_integers(vec![2, 0]);
        t.apply(&mut sample, (1, 2, 2), &mut rng);
        assert_eq!(sample, vec![0.0, 3.0, 0.0, 0.0]);

        // Centered crop is the identity.
        let mut sample = vec![1.0, 2.0, 3.0, 4.0];
        let mut rng = ScriptedRandom::default().with_integers(vec![1, 1]);
        t.apply(&mut sample, (1, 2, 2), &mut rng);
        assert_eq!(sample, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn cifar_pipelines() {
        assert_eq!(Transform::cifar_train().crop_padding, Some(4));
        assert!(Transform::cifar_train().horizontal_flip);
        assert_eq!(Transform::cifar_test().crop_padding, None);
        assert!((Transform::cifar_test().mean[0] - 125.3 / 255.0).abs() < 1e-7);
    }
}
