use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::augment::bbox::{box_lambda, rand_bbox, BBox};
use crate::augment::random::RandomSource;
use crate::augment::target::MixedTarget;
use crate::error::{Error, Result};
use crate::math::image_batch::{Batch, ImageBatch};

// ---------------------------------------------------------------------------
// Strategy selection
// ---------------------------------------------------------------------------

/// Name of an augmentation process as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessKind {
    None,
    Cutout,
    Mixup,
    CutMix,
    CutMixup,
    DivMix,
    AroundMix,
    FadeMixup,
    SoftCutout,
}

impl FromStr for ProcessKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none"       => Ok(ProcessKind::None),
            "cutout"     => Ok(ProcessKind::Cutout),
            "mixup"      => Ok(ProcessKind::Mixup),
            "cutmix"     => Ok(ProcessKind::CutMix),
            "cutmixup"   => Ok(ProcessKind::CutMixup),
            "divmix"     => Ok(ProcessKind::DivMix),
            "aroundmix"  => Ok(ProcessKind::AroundMix),
            "fademixup"  => Ok(ProcessKind::FadeMixup),
            "softcutout" => Ok(ProcessKind::SoftCutout),
            _ => Err(Error::config(format!("unknown data augmentation process: {}", s))),
        }
    }
}

/// Every tunable the strategies read, with the command-line defaults.
///
/// Only the fields of the selected strategy are carried into its
/// `Augmentation` variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentParams {
    pub beta: f64,
    pub cutout_prob: f64,
    pub cutout_n_holes: usize,
    pub cutout_length: usize,
    pub mixup_alpha: f64,
    pub cutmix_prob: f64,
    pub divmix_prob: f64,
    pub cutmixup_alpha: f64,
    pub cutmixup_prob: f64,
    pub aroundmix_alpha: f64,
    pub aroundmix_prob: f64,
    pub fademixup_alpha: f64,
    pub softcutout_prob: f64,
    pub softcutout_n_holes: usize,
    pub softcutout_length: usize,
    pub softcutout_alpha: f64,
}

impl Default for AugmentParams {
    fn default() -> Self {
        AugmentParams {
            beta: 0.0,
            cutout_prob: 0.0,
            cutout_n_holes: 1,
            cutout_length: 16,
            mixup_alpha: 1.0,
            cutmix_prob: 0.0,
            divmix_prob: 0.0,
            cutmixup_alpha: 1.0,
            cutmixup_prob: 0.0,
            aroundmix_alpha: 1.0,
            aroundmix_prob: 0.0,
            fademixup_alpha: 1.0,
            softcutout_prob: 0.0,
            softcutout_n_holes: 1,
            softcutout_length: 16,
            softcutout_alpha: 1.0,
        }
    }
}

/// The augmentation applied to every training mini-batch of a run.
///
/// `beta` on the gated variants is both the gate (`beta > 0`) and, for the
/// box-based variants, the Beta shape parameter of the box size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "process", rename_all = "snake_case")]
pub enum Augmentation {
    None,
    Cutout { prob: f64, beta: f64, n_holes: usize, length: usize },
    Mixup { alpha: f64 },
    CutMix { prob: f64, beta: f64 },
    CutMixup { prob: f64, beta: f64, alpha: f64 },
    DivMix { prob: f64 },
    AroundMix { prob: f64, alpha: f64 },
    FadeMixup { alpha: f64 },
    SoftCutout { prob: f64, beta: f64, n_holes: usize, length: usize, alpha: f64 },
}

/// Result of applying an augmentation to one mini-batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Augmented {
    pub images: ImageBatch,
    pub target: MixedTarget,
}

impl Augmented {
    fn unchanged(images: ImageBatch, labels: Vec<usize>) -> Augmented {
        Augmented { images, target: MixedTarget::single(labels) }
    }
}

impl Augmentation {
    /// Resolves a process name against `params`. Unknown names are a
    /// configuration error.
    pub fn select(process: &str, params: &AugmentParams) -> Result<Augmentation> {
        let kind: ProcessKind = process.parse()?;
        Ok(Augmentation::from_kind(kind, params))
    }

    pub fn from_kind(kind: ProcessKind, p: &AugmentParams) -> Augmentation {
        match kind {
            ProcessKind::None => Augmentation::None,
            ProcessKind::Cutout => Augmentation::Cutout {
                prob: p.cutout_prob,
                beta: p.beta,
                n_holes: p.cutout_n_holes,
                length: p.cutout_length,
            },
            ProcessKind::Mixup => Augmentation::Mixup { alpha: p.mixup_alpha },
            ProcessKind::CutMix => Augmentation::CutMix { prob: p.cutmix_prob, beta: p.beta },
            ProcessKind::CutMixup => Augmentation::CutMixup {
                prob: p.cutmixup_prob,
                beta: p.beta,
                alpha: p.cutmixup_alpha,
            },
            ProcessKind::DivMix => Augmentation::DivMix { prob: p.divmix_prob },
            ProcessKind::AroundMix => Augmentation::AroundMix {
                prob: p.aroundmix_prob,
                alpha: p.aroundmix_alpha,
            },
            ProcessKind::FadeMixup => Augmentation::FadeMixup { alpha: p.fademixup_alpha },
            ProcessKind::SoftCutout => Augmentation::SoftCutout {
                prob: p.softcutout_prob,
                beta: p.beta,
                n_holes: p.softcutout_n_holes,
                length: p.softcutout_length,
                alpha: p.softcutout_alpha,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Augmentation::None           => "none",
            Augmentation::Cutout { .. }     => "cutout",
            Augmentation::Mixup { .. }      => "mixup",
            Augmentation::CutMix { .. }     => "cutmix",
            Augmentation::CutMixup { .. }   => "cutmixup",
            Augmentation::DivMix { .. }     => "divmix",
            Augmentation::AroundMix { .. }  => "aroundmix",
            Augmentation::FadeMixup { .. }  => "fademixup",
            Augmentation::SoftCutout { .. } => "softcutout",
        }
    }

    /// Perturbs one mini-batch and returns the targets its loss is built from.
    ///
    /// Every random draw comes from `rng`, in a fixed order per strategy:
    /// the gate draw first (gated strategies), then mixing coefficients, then
    /// permutations, then box or hole centres.
    pub fn apply(&self, batch: Batch, rng: &mut dyn RandomSource) -> Augmented {
        let Batch { mut images, labels } = batch;
        let (h, w) = (images.h, images.w);

        match *self {
            Augmentation::None => Augmented::unchanged(images, labels),

            Augmentation::Cutout { prob, beta, n_holes, length } => {
                let r = rng.uniform();
                if beta > 0.0 && r < prob {
                    let mask = hole_mask(h, w, n_holes, length, 0.0, rng);
                    apply_mask(&mut images, &mask);
                }
                Augmented::unchanged(images, labels)
            }

            Augmentation::Mixup { alpha } => {
                let lam = mixing_coefficient(alpha, rng);
                let index = rng.permutation(images.n);
                if lam < 1.0 {
                    let partner = images.gather(&index);
                    blend(&mut images.data, &partner.data, lam as f32);
                }
                let permuted = permute(&labels, &index);
                Augmented {
                    images,
                    target: MixedTarget::pair(labels, lam, permuted, 1.0 - lam),
                }
            }

            Augmentation::CutMix { prob, beta } => {
                let r = rng.uniform();
                if !(beta > 0.0 && r < prob) {
                    return Augmented::unchanged(images, labels);
                }
                let lam = rng.beta(beta);
                let index = rng.permutation(images.n);
                let bbox = rand_bbox(h, w, lam, rng);
                let partner = images.gather(&index);
                blend_region(&mut images, &partner, &bbox, 0.0);
                // Re-derive the label weight from the clipped box.
                let lam = box_lambda(&bbox, h, w);
                let permuted = permute(&labels, &index);
                Augmented {
                    images,
                    target: MixedTarget::pair(labels, lam, permuted, 1.0 - lam),
                }
            }

            Augmentation::CutMixup { prob, beta, alpha } => {
                let r = rng.uniform();
                let mixup_lam = mixing_coefficient(alpha, rng);
                if !(beta > 0.0 && r < prob) {
                    return Augmented::unchanged(images, labels);
                }
                let cutmix_lam = rng.beta(beta);
                let index = rng.permutation(images.n);
                let bbox = rand_bbox(h, w, cutmix_lam, rng);
                let partner = images.gather(&index);
                blend_region(&mut images, &partner, &bbox, mixup_lam as f32);
                let cutmix_lam = box_lambda(&bbox, h, w);
                let weight_b = (1.0 - cutmix_lam) * (1.0 - mixup_lam);
                let permuted = permute(&labels, &index);
                Augmented {
                    images,
                    target: MixedTarget::pair(labels, 1.0 - weight_b, permuted, weight_b),
                }
            }

            Augmentation::DivMix { prob } => {
                let r = rng.uniform();
                if r >= prob {
                    return Augmented::unchanged(images, labels);
                }
                let (hh, hw) = (h / 2, w / 2);
                // Top-left stays; the other three quadrants come from three
                // independent partners.
                let quadrants = [
                    BBox { x1: 0, y1: hh, x2: hw, y2: h },
                    BBox { x1: hw, y1: 0, x2: w, y2: hh },
                    BBox { x1: hw, y1: hh, x2: w, y2: h },
                ];
                let indices: Vec<Vec<usize>> = (0..3).map(|_| rng.permutation(images.n)).collect();
                let source = images.clone();
                let mut parts = Vec::with_capacity(4);
                for (quadrant, index) in quadrants.iter().zip(&indices) {
                    let partner = source.gather(index);
                    blend_region(&mut images, &partner, quadrant, 0.0);
                    parts.push((permute(&labels, index), 0.25));
                }
                parts.insert(0, (labels, 0.25));
                Augmented { images, target: MixedTarget::weighted(parts) }
            }

            Augmentation::AroundMix { prob, alpha } => {
                let r = rng.uniform();
                if r < prob {
                    neighbour_blend(&mut images, alpha as f32);
                }
                Augmented::unchanged(images, labels)
            }

            Augmentation::FadeMixup { alpha } => {
                let lam = mixing_coefficient(alpha, rng);
                let index = rng.permutation(images.n);
                fade_rings(&mut images, lam);
                let permuted = permute(&labels, &index);
                Augmented {
                    images,
                    target: MixedTarget::pair(labels, 1.0 - lam, permuted, lam),
                }
            }

            Augmentation::SoftCutout { prob, beta, n_holes, length, alpha } => {
                let r = rng.uniform();
                if beta > 0.0 && r < prob {
                    let mask = hole_mask(h, w, n_holes, length, alpha as f32, rng);
                    apply_mask(&mut images, &mask);
                }
                Augmented::unchanged(images, labels)
            }
        }
    }
}

impl fmt::Display for Augmentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Augmentation::None => write!(f, "none"),
            Augmentation::Cutout { prob, beta, n_holes, length } => write!(
                f, "cutout(prob={prob}, beta={beta}, holes={n_holes}, length={length})"
            ),
            Augmentation::Mixup { alpha } => write!(f, "mixup(alpha={alpha})"),
            Augmentation::CutMix { prob, beta } => write!(f, "cutmix(prob={prob}, beta={beta})"),
            Augmentation::CutMixup { prob, beta, alpha } => write!(
                f, "cutmixup(prob={prob}, beta={beta}, alpha={alpha})"
            ),
            Augmentation::DivMix { prob } => write!(f, "divmix(prob={prob})"),
            Augmentation::AroundMix { prob, alpha } => write!(f, "aroundmix(prob={prob}, alpha={alpha})"),
            Augmentation::FadeMixup { alpha } => write!(f, "fademixup(alpha={alpha})"),
            Augmentation::SoftCutout { prob, beta, n_holes, length, alpha } => write!(
                f, "softcutout(prob={prob}, beta={beta}, holes={n_holes}, length={length}, alpha={alpha})"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Pixel operations
// ---------------------------------------------------------------------------

/// `Beta(alpha, alpha)` draw, or exactly 1 (no mixing) when `alpha <= 0`.
fn mixing_coefficient(alpha: f64, rng: &mut dyn RandomSource) -> f64 {
    if alpha > 0.0 {
        rng.beta(alpha)
    } else {
        1.0
    }
}

fn permute(labels: &[usize], index: &[usize]) -> Vec<usize> {
    index.iter().map(|&i| labels[i]).collect()
}

/// `dst = lam · dst + (1 - lam) · src`, element-wise.
fn blend(dst: &mut [f32], src: &[f32], lam: f32) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d = lam * *d + (1.0 - lam) * s;
    }
}

/// Blends `partner` into `images` inside `bbox` on every sample and channel,
/// keeping `keep` of the original pixel. `keep == 0` is a straight paste.
fn blend_region(images: &mut ImageBatch, partner: &ImageBatch, bbox: &BBox, keep: f32) {
    if bbox.area() == 0 {
        return;
    }
    for n in 0..images.n {
        for c in 0..images.c {
            for y in bbox.y1..bbox.y2 {
                let start = images.index(n, c, y, bbox.x1);
                let end = start + (bbox.x2 - bbox.x1);
                let src = &partner.data[start..end];
                let dst = &mut images.data[start..end];
                if keep == 0.0 {
                    dst.copy_from_slice(src);
                } else {
                    blend(dst, src, keep);
                }
            }
        }
    }
}

/// `h × w` mask of ones with `n_holes` square holes set to `fill`.
///
/// Each hole is centred on a uniform pixel (row drawn before column) and
/// spans `length / 2` on either side, clipped to the image.
fn hole_mask(
    h: usize,
    w: usize,
    n_holes: usize,
    length: usize,
    fill: f32,
    rng: &mut dyn RandomSource,
) -> Vec<f32> {
    let mut mask = vec![1.0f32; h * w];
    let half = length / 2;
    for _ in 0..n_holes {
        let y = rng.below(h);
        let x = rng.below(w);
        let y1 = y.saturating_sub(half);
        let y2 = (y + half).min(h);
        let x1 = x.saturating_sub(half);
        let x2 = (x + half).min(w);
        for row in y1..y2 {
            mask[row * w + x1..row * w + x2].fill(fill);
        }
    }
    mask
}

/// Multiplies every channel of every sample by the same spatial mask.
fn apply_mask(images: &mut ImageBatch, mask: &[f32]) {
    let plane = images.h * images.w;
    if plane == 0 {
        return;
    }
    for chunk in images.data.chunks_mut(plane) {
        for (v, m) in chunk.iter_mut().zip(mask) {
            *v *= m;
        }
    }
}

const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1),           (0, 1),
    (1, -1),  (1, 0),  (1, 1),
];

/// Replaces each pixel with `(1 - 8·alpha)·p + alpha·Σ neighbours`, where
/// neighbours falling outside the image simply contribute nothing.
fn neighbour_blend(images: &mut ImageBatch, alpha: f32) {
    let (h, w) = (images.h as isize, images.w as isize);
    let source = images.data.clone();
    let centre = 1.0 - 8.0 * alpha;
    for n in 0..images.n {
        for c in 0..images.c {
            for y in 0..h {
                for x in 0..w {
                    let idx = images.index(n, c, y as usize, x as usize);
                    let mut v = centre * source[idx];
                    for &(dy, dx) in &NEIGHBOURS {
                        let (ny, nx) = (y + dy, x + dx);
                        if ny >= 0 && ny < h && nx >= 0 && nx < w {
                            v += alpha * source[images.index(n, c, ny as usize, nx as usize)];
                        }
                    }
                    images.data[idx] = v;
                }
            }
        }
    }
}

/// Ring-wise fade pass of fademixup.
///
/// The image is split into `min(h, w) / 2` concentric square rings from the
/// border inwards; ring `i` gets weight `i · lam / ((1/6)·s·(s+1)·(s-4))` with
/// `s = min(h, w) / 2`. Each ring is blended with its own pixels rather than
/// the partner's, so the pass leaves the batch unchanged up to rounding.
fn fade_rings(images: &mut ImageBatch, lam: f64) {
    let (h, w) = (images.h, images.w);
    let shorter = h.min(w);
    if shorter == 0 {
        return;
    }
    let s = shorter as f64 / 2.0;
    let denom = (1.0 / 6.0) * s * (s + 1.0) * (s - 4.0);
    let unit = if denom.is_finite() && denom != 0.0 { lam / denom } else { 0.0 };

    for i in 0..shorter / 2 {
        let (w_i, w_next) = (i * w / shorter, (i + 1) * w / shorter);
        let (h_i, h_next) = (i * h / shorter, (i + 1) * h / shorter);
        let outer = BBox { x1: w_i, y1: h_i, x2: w - w_i, y2: h - h_i };
        let inner = BBox {
            x1: w_next,
            y1: h_next,
            x2: w.saturating_sub(w_next).max(w_next),
            y2: h.saturating_sub(h_next).max(h_next),
        };
        let lam_i = (i as f64 * unit) as f32;
        for n in 0..images.n {
            for c in 0..images.c {
                for y in outer.y1..outer.y2 {
                    for x in outer.x1..outer.x2 {
                        if inner.contains(y, x) {
                            continue;
                        }
                        let idx = images.index(n, c, y, x);
                        let own = images.data[idx];
                        images.data[idx] = (1.0 - lam_i) * own + lam_i * own;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::random::{ScriptedRandom, StdRandom};

    fn ramp_batch(n: usize, c: usize, h: usize, w: usize) -> Batch {
        let data = (0..n * c * h * w).map(|v| v as f32).collect();
        let images = ImageBatch::from_vec(n, c, h, w, data).unwrap();
        Batch::new(images, (0..n).collect()).unwrap()
    }

    fn per_sample_batch(n: usize, h: usize, w: usize) -> Batch {
        // Every pixel of sample i holds the value i.
        let mut data = Vec::with_capacity(n * h * w);
        for i in 0..n {
            data.extend(std::iter::repeat(i as f32).take(h * w));
        }
        let images = ImageBatch::from_vec(n, 1, h, w, data).unwrap();
        Batch::new(images, (0..n).collect()).unwrap()
    }

    fn all_strategies() -> Vec<Augmentation> {
        vec![
            Augmentation::None,
            Augmentation::Cutout { prob: 1.0, beta: 1.0, n_holes: 2, length: 4 },
            Augmentation::Mixup { alpha: 1.0 },
            Augmentation::CutMix { prob: 1.0, beta: 1.0 },
            Augmentation::CutMixup { prob: 1.0, beta: 1.0, alpha: 0.4 },
            Augmentation::DivMix { prob: 1.0 },
            Augmentation::AroundMix { prob: 1.0, alpha: 0.05 },
            Augmentation::FadeMixup { alpha: 1.0 },
            Augmentation::SoftCutout { prob: 1.0, beta: 1.0, n_holes: 1, length: 4, alpha: 0.5 },
        ]
    }

    #[test]
    fn unknown_process_is_a_config_error() {
        let err = Augmentation::select("augmix", &AugmentParams::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("augmix"));
    }

    #[test]
    fn select_carries_only_the_chosen_parameters() {
        let params = AugmentParams { beta: 1.0, cutmix_prob: 0.5, ..AugmentParams::default() };
        assert_eq!(
            Augmentation::select("cutmix", &params).unwrap(),
            Augmentation::CutMix { prob: 0.5, beta: 1.0 }
        );
        assert_eq!(Augmentation::select("None", &params).unwrap(), Augmentation::None);
    }

    #[test]
    fn weights_sum_to_one_for_every_strategy() {
        let mut rng = StdRandom::seeded(1234);
        for strategy in all_strategies() {
            for _ in 0..25 {
                let out = strategy.apply(ramp_batch(6, 3, 8, 8), &mut rng);
                assert!(
                    (out.target.total_weight() - 1.0).abs() < 1e-9,
                    "{} weights {:?}",
                    strategy.name(),
                    out.target.weights()
                );
                assert!(out.target.weights().iter().all(|w| (0.0..=1.0).contains(w)));
                assert_eq!(out.images.data.len(), 6 * 3 * 8 * 8);
            }
        }
    }

    #[test]
    fn identity_leaves_batch_untouched() {
        let batch = ramp_batch(4, 3, 5, 5);
        let original = batch.clone();
        let out = Augmentation::None.apply(batch, &mut StdRandom::seeded(0));
        assert_eq!(out.images, original.images);
        assert_eq!(out.target, MixedTarget::single(original.labels));
        assert_eq!(out.target.weights(), vec![1.0]);
    }

    #[test]
    fn mixup_with_zero_alpha_keeps_images() {
        let images = ImageBatch::from_vec(3, 1, 4, 4, (0..48).map(|v| v as f32 * 0.1).collect()).unwrap();
        let batch = Batch::new(images.clone(), vec![0, 1, 2]).unwrap();
        let mut rng = ScriptedRandom::new().with_permutations([vec![2, 0, 1]]);
        let out = Augmentation::Mixup { alpha: 0.0 }.apply(batch, &mut rng);
        assert_eq!(out.images, images);
        assert_eq!(
            out.target,
            MixedTarget::pair(vec![0, 1, 2], 1.0, vec![2, 0, 1], 0.0)
        );
    }

    #[test]
    fn mixup_blends_with_partner() {
        let batch = per_sample_batch(2, 2, 2);
        let mut rng = ScriptedRandom::new().with_betas([0.25]).with_permutations([vec![1, 0]]);
        let out = Augmentation::Mixup { alpha: 1.0 }.apply(batch, &mut rng);
        // sample 0: 0.25·0 + 0.75·1, sample 1: 0.25·1 + 0.75·0
        assert!(out.images.sample(0).iter().all(|&v| (v - 0.75).abs() < 1e-6));
        assert!(out.images.sample(1).iter().all(|&v| (v - 0.25).abs() < 1e-6));
        assert_eq!(out.target.weights(), vec![0.25, 0.75]);
        assert_eq!(out.target.parts[1].labels, vec![1, 0]);
    }

    #[test]
    fn cutout_zeroes_one_small_square() {
        let images = ImageBatch::from_vec(1, 1, 8, 8, vec![1.0; 64]).unwrap();
        let batch = Batch::new(images, vec![0]).unwrap();
        let strategy = Augmentation::Cutout { prob: 1.0, beta: 1.0, n_holes: 1, length: 2 };
        let mut rng = ScriptedRandom::new().with_uniforms([0.0]).with_integers([3, 5]);
        let out = strategy.apply(batch, &mut rng);
        for y in 0..8 {
            for x in 0..8 {
                let expected = if (2..4).contains(&y) && (4..6).contains(&x) { 0.0 } else { 1.0 };
                assert_eq!(out.images.data[y * 8 + x], expected, "pixel ({y}, {x})");
            }
        }
        assert_eq!(out.target.weights(), vec![1.0]);
    }

    #[test]
    fn cutout_hole_is_clipped_at_border_with_random_source() {
        let strategy = Augmentation::Cutout { prob: 1.0, beta: 1.0, n_holes: 1, length: 2 };
        let mut rng = StdRandom::seeded(99);
        for _ in 0..50 {
            let images = ImageBatch::from_vec(1, 1, 8, 8, vec![1.0; 64]).unwrap();
            let out = strategy.apply(Batch::new(images, vec![0]).unwrap(), &mut rng);
            let zeros: Vec<(usize, usize)> = (0..64)
                .filter(|&i| out.images.data[i] == 0.0)
                .map(|i| (i / 8, i % 8))
                .collect();
            assert!((1..=4).contains(&zeros.len()));
            let (ys, xs): (Vec<_>, Vec<_>) = zeros.iter().cloned().unzip();
            let span = |v: &[usize]| v.iter().max().unwrap() - v.iter().min().unwrap();
            assert!(span(&ys) <= 1 && span(&xs) <= 1);
            assert_eq!(zeros.len(), (span(&ys) + 1) * (span(&xs) + 1));
            assert!(out.images.data.iter().all(|&v| v == 0.0 || v == 1.0));
        }
    }

    #[test]
    fn cutout_mask_hits_every_channel_and_sample() {
        let images = ImageBatch::from_vec(2, 3, 4, 4, vec![2.0; 96]).unwrap();
        let strategy = Augmentation::Cutout { prob: 1.0, beta: 1.0, n_holes: 1, length: 2 };
        let mut rng = ScriptedRandom::new().with_integers([1, 1]);
        let out = strategy.apply(Batch::new(images, vec![0, 1]).unwrap(), &mut rng);
        for n in 0..2 {
            for c in 0..3 {
                assert_eq!(out.images.data[out.images.index(n, c, 0, 0)], 0.0);
                assert_eq!(out.images.data[out.images.index(n, c, 1, 1)], 0.0);
                assert_eq!(out.images.data[out.images.index(n, c, 2, 2)], 2.0);
            }
        }
    }

    #[test]
    fn gated_strategies_fall_back_to_identity() {
        let disabled = [
            Augmentation::Cutout { prob: 1.0, beta: 0.0, n_holes: 1, length: 4 },
            Augmentation::Cutout { prob: 0.0, beta: 1.0, n_holes: 1, length: 4 },
            Augmentation::CutMix { prob: 1.0, beta: 0.0 },
            Augmentation::CutMix { prob: 0.0, beta: 1.0 },
            Augmentation::CutMixup { prob: 1.0, beta: 0.0, alpha: 1.0 },
            Augmentation::DivMix { prob: 0.0 },
            Augmentation::AroundMix { prob: 0.0, alpha: 0.1 },
            Augmentation::SoftCutout { prob: 1.0, beta: 0.0, n_holes: 1, length: 4, alpha: 0.5 },
        ];
        let mut rng = StdRandom::seeded(5);
        for strategy in disabled {
            let batch = ramp_batch(3, 2, 6, 6);
            let original = batch.clone();
            let out = strategy.apply(batch, &mut rng);
            assert_eq!(out.images, original.images, "{strategy}");
            assert_eq!(out.target, MixedTarget::single(original.labels), "{strategy}");
        }
    }

    #[test]
    fn cutmix_pastes_partner_box_and_reweights() {
        let batch = per_sample_batch(2, 8, 8);
        let mut rng = ScriptedRandom::new()
            .with_uniforms([0.0])
            .with_betas([0.75])
            .with_permutations([vec![1, 0]])
            .with_integers([4, 4]);
        let out = Augmentation::CutMix { prob: 1.0, beta: 1.0 }.apply(batch, &mut rng);
        let s0 = out.images.sample(0);
        for y in 0..8 {
            for x in 0..8 {
                let inside = (2..6).contains(&y) && (2..6).contains(&x);
                assert_eq!(s0[y * 8 + x], if inside { 1.0 } else { 0.0 });
            }
        }
        assert_eq!(out.target.weights(), vec![0.75, 0.25]);
        assert_eq!(out.target.parts[1].labels, vec![1, 0]);
    }

    #[test]
    fn cutmix_weight_follows_clipped_box() {
        let batch = per_sample_batch(2, 8, 8);
        let mut rng = ScriptedRandom::new()
            .with_uniforms([0.0])
            .with_betas([0.0])
            .with_permutations([vec![1, 0]])
            .with_integers([0, 0]);
        let out = Augmentation::CutMix { prob: 1.0, beta: 1.0 }.apply(batch, &mut rng);
        // Nominal 8x8 box centred on the corner clips to 4x4.
        assert_eq!(out.target.weights(), vec![0.75, 0.25]);
    }

    #[test]
    fn cutmixup_blends_inside_box_only() {
        let batch = per_sample_batch(2, 8, 8);
        let mut rng = ScriptedRandom::new()
            .with_uniforms([0.0])
            .with_betas([0.5, 0.75])
            .with_permutations([vec![1, 0]])
            .with_integers([4, 4]);
        let strategy = Augmentation::CutMixup { prob: 1.0, beta: 1.0, alpha: 1.0 };
        let out = strategy.apply(batch, &mut rng);
        let s0 = out.images.sample(0);
        assert_eq!(s0[0], 0.0);
        assert!((s0[3 * 8 + 3] - 0.5).abs() < 1e-6);
        // box covers a quarter: weight_b = 0.25 · 0.5
        let weights = out.target.weights();
        assert!((weights[0] - 0.875).abs() < 1e-12);
        assert!((weights[1] - 0.125).abs() < 1e-12);
    }

    #[test]
    fn divmix_assembles_four_quadrants() {
        let batch = per_sample_batch(4, 4, 4);
        let mut rng = ScriptedRandom::new().with_uniforms([0.0]).with_permutations([
            vec![1, 2, 3, 0],
            vec![2, 3, 0, 1],
            vec![3, 0, 1, 2],
        ]);
        let out = Augmentation::DivMix { prob: 1.0 }.apply(batch, &mut rng);
        let s0 = out.images.sample(0);
        assert_eq!(s0[0], 0.0); // top-left, own
        assert_eq!(s0[3 * 4], 1.0); // bottom-left, first partner
        assert_eq!(s0[3], 2.0); // top-right, second partner
        assert_eq!(s0[15], 3.0); // bottom-right, third partner
        assert_eq!(out.target.weights(), vec![0.25; 4]);
        assert_eq!(out.target.parts[0].labels, vec![0, 1, 2, 3]);
        assert_eq!(out.target.parts[3].labels, vec![3, 0, 1, 2]);
    }

    #[test]
    fn aroundmix_blends_interior_and_edges() {
        let images = ImageBatch::from_vec(1, 1, 3, 3, vec![1.0; 9]).unwrap();
        let batch = Batch::new(images, vec![0]).unwrap();
        let mut rng = ScriptedRandom::new().with_uniforms([0.0]);
        let out = Augmentation::AroundMix { prob: 1.0, alpha: 0.1 }.apply(batch, &mut rng);
        let d = &out.images.data;
        // centre has all 8 neighbours, corners 3, edge midpoints 5
        assert!((d[4] - 1.0).abs() < 1e-6);
        assert!((d[0] - (0.2 + 0.3)).abs() < 1e-6);
        assert!((d[1] - (0.2 + 0.5)).abs() < 1e-6);
        assert_eq!(out.target.weights(), vec![1.0]);
    }

    #[test]
    fn fademixup_ring_pass_leaves_pixels_unchanged() {
        let batch = ramp_batch(3, 2, 32, 32);
        let original = batch.images.clone();
        let mut rng = ScriptedRandom::new().with_betas([0.6]).with_permutations([vec![2, 0, 1]]);
        let out = Augmentation::FadeMixup { alpha: 1.0 }.apply(batch, &mut rng);
        for (a, b) in out.images.data.iter().zip(&original.data) {
            assert!((a - b).abs() <= 1e-6 * b.abs().max(1.0), "{a} vs {b}");
        }
        let weights = out.target.weights();
        assert!((weights[0] - 0.4).abs() < 1e-12);
        assert!((weights[1] - 0.6).abs() < 1e-12);
        assert_eq!(out.target.parts[1].labels, vec![2, 0, 1]);
    }

    #[test]
    fn fademixup_survives_degenerate_ring_count() {
        // min(h, w) = 8 makes the ring normaliser zero.
        let batch = ramp_batch(2, 1, 8, 8);
        let original = batch.images.clone();
        let out = Augmentation::FadeMixup { alpha: 1.0 }.apply(batch, &mut StdRandom::seeded(2));
        assert_eq!(out.images, original);
        assert!(out.target.weights().iter().all(|w| w.is_finite()));
    }

    #[test]
    fn softcutout_scales_hole_by_alpha() {
        let images = ImageBatch::from_vec(1, 1, 4, 4, vec![2.0; 16]).unwrap();
        let strategy = Augmentation::SoftCutout { prob: 1.0, beta: 1.0, n_holes: 1, length: 2, alpha: 0.25 };
        let mut rng = ScriptedRandom::new().with_integers([2, 2]);
        let out = strategy.apply(Batch::new(images, vec![0]).unwrap(), &mut rng);
        let scaled = out.images.data.iter().filter(|&&v| v == 0.5).count();
        let kept = out.images.data.iter().filter(|&&v| v == 2.0).count();
        assert_eq!((scaled, kept), (4, 12));
    }
}
