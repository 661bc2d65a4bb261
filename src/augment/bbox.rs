use crate::augment::random::RandomSource;

/// Axis-aligned pixel box, half-open: columns `x1..x2`, rows `y1..y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
    pub x1: usize,
    pub y1: usize,
    pub x2: usize,
    pub y2: usize,
}

impl BBox {
    pub fn area(&self) -> usize {
        (self.x2 - self.x1) * (self.y2 - self.y1)
    }

    #[inline]
    pub fn contains(&self, y: usize, x: usize) -> bool {
        y >= self.y1 && y < self.y2 && x >= self.x1 && x < self.x2
    }
}

/// Samples a cutmix box whose nominal area is `(1 - lam)` of the image.
///
/// The side ratio is `sqrt(1 - lam)`; the centre is uniform over the image
/// and the box is clipped to the image bounds, so the real area can be
/// anything from zero up to the nominal area. Column centre is drawn first,
/// then the row centre.
pub fn rand_bbox(height: usize, width: usize, lam: f64, rng: &mut dyn RandomSource) -> BBox {
    let cut_rat = (1.0 - lam).max(0.0).sqrt();
    let cut_w = (width as f64 * cut_rat).floor() as i64;
    let cut_h = (height as f64 * cut_rat).floor() as i64;

    let cx = rng.below(width) as i64;
    let cy = rng.below(height) as i64;

    let clip = |v: i64, hi: usize| v.clamp(0, hi as i64) as usize;

    BBox {
        x1: clip(cx - cut_w / 2, width),
        y1: clip(cy - cut_h / 2, height),
        x2: clip(cx + cut_w / 2, width),
        y2: clip(cy + cut_h / 2, height),
    }
}

/// Label weight of the original sample once `bbox` has been pasted over it:
/// `1 - area(bbox) / (height * width)`.
pub fn box_lambda(bbox: &BBox, height: usize, width: usize) -> f64 {
    let total = height * width;
    if total == 0 {
        return 1.0;
    }
    1.0 - bbox.area() as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::random::{ScriptedRandom, StdRandom};

    #[test]
    fn box_stays_inside_image() {
        let mut rng = StdRandom::seeded(42);
        for &(h, w) in &[(1, 1), (4, 7), (32, 32), (31, 17)] {
            for step in 1..20 {
                let lam = step as f64 / 20.0;
                let b = rand_bbox(h, w, lam, &mut rng);
                assert!(b.x1 <= b.x2 && b.x2 <= w, "{b:?} outside width {w}");
                assert!(b.y1 <= b.y2 && b.y2 <= h, "{b:?} outside height {h}");
                let l = box_lambda(&b, h, w);
                assert!((0.0..=1.0).contains(&l));
            }
        }
    }

    #[test]
    fn centred_box_has_nominal_size() {
        // lam = 0.75 → ratio 0.5 → 4x4 box on an 8x8 image centred at (4, 4).
        let mut rng = ScriptedRandom::new().with_integers([4, 4]);
        let b = rand_bbox(8, 8, 0.75, &mut rng);
        assert_eq!(b, BBox { x1: 2, y1: 2, x2: 6, y2: 6 });
        assert_eq!(box_lambda(&b, 8, 8), 0.75);
    }

    #[test]
    fn corner_box_is_clipped() {
        let mut rng = ScriptedRandom::new().with_integers([0, 7]);
        let b = rand_bbox(8, 8, 0.0, &mut rng);
        assert_eq!(b, BBox { x1: 0, y1: 3, x2: 4, y2: 8 });
        assert_eq!(box_lambda(&b, 8, 8), 1.0 - 20.0 / 64.0);
    }

    #[test]
    fn lam_of_one_gives_empty_box() {
        let mut rng = ScriptedRandom::new().with_integers([3, 3]);
        let b = rand_bbox(8, 8, 1.0, &mut rng);
        assert_eq!(b.area(), 0);
        assert_eq!(box_lambda(&b, 8, 8), 1.0);
    }
}
