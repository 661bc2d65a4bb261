use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Distribution};

/// Source of every stochastic draw the augmentation strategies make.
///
/// Strategies never touch a global generator; they pull their gate draws,
/// mixing coefficients, permutations and hole/box centres from here so that
/// tests can script the exact sequence.
pub trait RandomSource {
    /// Uniform draw in `[0, 1)`.
    fn uniform(&mut self) -> f64;

    /// Uniform integer in `[0, n)`. Returns 0 when `n == 0`.
    fn below(&mut self, n: usize) -> usize;

    /// Draw from the symmetric `Beta(alpha, alpha)` distribution. Callers
    /// only ask for `alpha > 0`.
    fn beta(&mut self, alpha: f64) -> f64;

    /// Uniformly random permutation of `0..n`.
    fn permutation(&mut self, n: usize) -> Vec<usize>;
}

/// `RandomSource` backed by a `StdRng`.
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    pub fn from_entropy() -> StdRandom {
        StdRandom { rng: StdRng::from_entropy() }
    }

    pub fn seeded(seed: u64) -> StdRandom {
        StdRandom { rng: StdRng::seed_from_u64(seed) }
    }
}

impl RandomSource for StdRandom {
    fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn below(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        self.rng.gen_range(0..n)
    }

    fn beta(&mut self, alpha: f64) -> f64 {
        match Beta::new(alpha, alpha) {
            Ok(dist) => dist.sample(&mut self.rng),
            // Degenerate shape parameters mean "no mixing".
            Err(_) => 1.0,
        }
    }

    fn permutation(&mut self, n: usize) -> Vec<usize> {
        let mut index: Vec<usize> = (0..n).collect();
        index.shuffle(&mut self.rng);
        index
    }
}

/// `RandomSource` that replays scripted values, one queue per kind of draw.
///
/// When a queue runs dry it falls back to a fixed value: `0.0` for uniforms,
/// `0` for integers, `0.5` for Beta draws and the identity permutation.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    uniforms: VecDeque<f64>,
    integers: VecDeque<usize>,
    betas: VecDeque<f64>,
    permutations: VecDeque<Vec<usize>>,
}

impl ScriptedRandom {
    pub fn new() -> ScriptedRandom {
        ScriptedRandom::default()
    }

    pub fn with_uniforms(mut self, values: impl IntoIterator<Item = f64>) -> Self {
        self.uniforms.extend(values);
        self
    }

    pub fn with_integers(mut self, values: impl IntoIterator<Item = usize>) -> Self {
        self.integers.extend(values);
        self
    }

    pub fn with_betas(mut self, values: impl IntoIterator<Item = f64>) -> Self {
        self.betas.extend(values);
        self
    }

    pub fn with_permutations(mut self, values: impl IntoIterator<Item = Vec<usize>>) -> Self {
        self.permutations.extend(values);
        self
    }
}

impl RandomSource for ScriptedRandom {
    fn uniform(&mut self) -> f64 {
        self.uniforms.pop_front().unwrap_or(0.0)
    }

    fn below(&mut self, n: usize) -> usize {
        let v = self.integers.pop_front().unwrap_or(0);
        v.min(n.saturating_sub(1))
    }

    fn beta(&mut self, _alpha: f64) -> f64 {
        self.betas.pop_front().unwrap_or(0.5)
    }

    fn permutation(&mut self, n: usize) -> Vec<usize> {
        match self.permutations.pop_front() {
            Some(p) if p.len() == n => p,
            _ => (0..n).collect(),
        }
    }
}
