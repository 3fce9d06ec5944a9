use std::borrow::Borrow;
use std::collections::hash_map;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

use num_traits::{AsPrimitive, Unsigned};
use rand::SeedableRng;
use rand_chacha::ChaChaRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::noise::{NoiseSource, PermutationSource, RngSource};
use crate::{MisraGries, MisraGriesError, Parameter};

/// Smallest noisy count that is reported for a given `delta`.
///
/// Computed as `1 + 2 ln(3 / delta)`. This constant has not been checked
/// against the final version of the paper.
pub fn release_threshold(delta: f64) -> f64 {
    1.0 + 2.0 * (3.0 / delta).ln()
}

fn check_parameters(epsilon: f64, delta: f64) -> Result<(), MisraGriesError> {
    if !(epsilon.is_finite() && epsilon > 0.0) {
        return Err(MisraGriesError::InvalidParameter(Parameter::Epsilon));
    }
    if !(delta > 0.0 && delta < 1.0) {
        return Err(MisraGriesError::InvalidParameter(Parameter::Delta));
    }

    Ok(())
}

/// Sparse noisy histogram produced by [`PrivateReleaser`].
///
/// Items whose noisy count fell below the threshold are absent, they are
/// not reported with a small or negative value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "K: Serialize + Hash + Eq",
    deserialize = "K: Deserialize<'de> + Hash + Eq"
))]
pub struct PrivateHistogram<K>
where
    K: Hash + Eq,
{
    counts:    HashMap<K, f64>,
    epsilon:   f64,
    delta:     f64,
    threshold: f64,
}

impl<K> PrivateHistogram<K>
where
    K: Hash + Eq,
{
    pub fn get<Q>(&self, item: &Q) -> Option<f64>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.counts.get(item).copied()
    }

    pub fn contains<Q>(&self, item: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.counts.contains_key(item)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, K, f64> {
        self.counts.iter()
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn into_inner(self) -> HashMap<K, f64> {
        self.counts
    }
}

impl<K> IntoIterator for PrivateHistogram<K>
where
    K: Hash + Eq,
{
    type Item = (K, f64);
    type IntoIter = hash_map::IntoIter<K, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.into_iter()
    }
}

/// Releases sketch counters as an (ε, δ)-differentially private histogram.
///
/// Every call draws fresh noise. Releasing the same sketch several times
/// composes: the total privacy loss grows with the number of releases and
/// is left for the caller to account for.
#[derive(Debug, Clone)]
pub struct PrivateReleaser<N, P> {
    noise:       N,
    permutation: P,
}

impl PrivateReleaser<RngSource<ChaChaRng>, RngSource<ChaChaRng>> {
    pub fn from_seed(seed: u64) -> Self {
        Self::build(Some(seed))
    }

    pub fn from_entropy() -> Self {
        Self::build(None)
    }

    fn build(seed: Option<u64>) -> Self {
        let mut noise = match seed {
            Some(seed) => ChaChaRng::seed_from_u64(seed),
            None => ChaChaRng::from_entropy(),
        };

        let mut permutation = noise.clone();

        noise.set_stream(0);
        permutation.set_stream(1);

        PrivateReleaser::new(RngSource::new(noise), RngSource::new(permutation))
    }
}

impl<N, P> PrivateReleaser<N, P>
where
    N: NoiseSource,
    P: PermutationSource,
{
    pub fn new(noise: N, permutation: P) -> Self {
        PrivateReleaser {
            noise:       noise,
            permutation: permutation,
        }
    }

    pub fn release<K, C, S>(
        &mut self,
        sketch: &MisraGries<K, C, S>,
        epsilon: f64,
        delta: f64,
    ) -> Result<PrivateHistogram<K>, MisraGriesError>
    where
        K: Hash + Eq + Clone,
        C: Copy + Ord + Unsigned + AsPrimitive<u64> + AsPrimitive<f64>,
        S: BuildHasher,
    {
        self.release_counts(sketch.counts().iter(), epsilon, delta)
    }

    /// Releases a snapshot of `(item, count)` pairs.
    ///
    /// One global Laplace draw is shared by every item and each item gets
    /// its own draw on top of it. Items are visited in a uniformly random
    /// order and kept only when the noisy count reaches
    /// [`release_threshold`].
    pub fn release_counts<'a, K, C, I>(
        &mut self,
        counts: I,
        epsilon: f64,
        delta: f64,
    ) -> Result<PrivateHistogram<K>, MisraGriesError>
    where
        I: IntoIterator<Item = (&'a K, &'a C)>,
        K: 'a + Hash + Eq + Clone,
        C: 'a + Copy + AsPrimitive<f64>,
    {
        check_parameters(epsilon, delta)?;

        let scale = 1.0 / epsilon;
        let threshold = release_threshold(delta);

        let global = self.noise.laplace(scale);

        let mut pairs: Vec<(&K, f64)> = counts
            .into_iter()
            .map(|(item, count)| (item, AsPrimitive::<f64>::as_(*count)))
            .collect();

        self.permutation.shuffle(&mut pairs);

        let mut released = HashMap::new();

        for (item, count) in pairs {
            let noisy = count + global + self.noise.laplace(scale);

            if noisy >= threshold {
                released.insert(item.clone(), noisy);
            }
        }

        debug!(
            epsilon,
            delta,
            threshold,
            released = released.len(),
            "released private histogram"
        );

        Ok(PrivateHistogram {
            counts:    released,
            epsilon:   epsilon,
            delta:     delta,
            threshold: threshold,
        })
    }
}
