use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Exp1};

/// Source of Laplace distributed noise.
pub trait NoiseSource {
    /// Draws one value from `Laplace(0, scale)`.
    fn laplace(&mut self, scale: f64) -> f64;
}

/// Source of uniformly random permutations.
pub trait PermutationSource {
    fn shuffle<T>(&mut self, items: &mut [T]);
}

/// Noise and permutation source backed by a `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R: Rng> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        RngSource { rng: rng }
    }

    pub fn into_inner(self) -> R {
        self.rng
    }
}

impl<R: Rng> NoiseSource for RngSource<R> {
    fn laplace(&mut self, scale: f64) -> f64 {
        // The difference of two unit exponentials is Laplace(0, 1).
        let a: f64 = Exp1.sample(&mut self.rng);
        let b: f64 = Exp1.sample(&mut self.rng);

        scale * (a - b)
    }
}

impl<R: Rng> PermutationSource for RngSource<R> {
    fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}
