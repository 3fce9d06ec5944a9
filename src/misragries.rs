use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

use num_traits::{AsPrimitive, CheckedAdd, Unsigned};
use tracing::trace;

use crate::{MisraGriesError, Parameter};

/// Bounded-memory frequency sketch.
///
/// Keeps at most `capacity` counters. When an unseen item arrives while
/// every counter is in use, all counters are decremented by one and the
/// ones reaching zero are dropped; the incoming item is not inserted.
///
/// `C` is the counter type. [`update`](Self::update) uses plain addition,
/// so a narrow `C` such as `u8` overflows (a panic in debug builds) once
/// an item is seen more than `C::MAX` times; use
/// [`update_checked`](Self::update_checked) when that can happen.
#[derive(Debug, Clone)]
pub struct MisraGries<K, C = u64, S = RandomState>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    capacity:     usize,
    counters:     HashMap<K, C, S>,
    stream_count: u64,
    offset:       u64,
}

impl<K, C> MisraGries<K, C, RandomState>
where
    K: Hash + Eq,
    C: Copy + Ord + Unsigned + AsPrimitive<u64>,
{
    pub fn new(capacity: usize) -> Result<Self, MisraGriesError> {
        Self::with_hasher(capacity, RandomState::new())
    }
}

impl<K, C, S> MisraGries<K, C, S>
where
    K: Hash + Eq,
    C: Copy + Ord + Unsigned + AsPrimitive<u64>,
    S: BuildHasher,
{
    // Upper limit on the table reserved up front; larger tables grow.
    const INITIAL_RESERVE: usize = 1024;

    pub fn with_hasher(
        capacity: usize,
        builder: S,
    ) -> Result<Self, MisraGriesError> {
        if capacity < 1 {
            return Err(MisraGriesError::InvalidParameter(
                Parameter::Capacity,
            ));
        }

        Ok(MisraGries {
            capacity:     capacity,
            counters:     HashMap::with_capacity_and_hasher(
                capacity.min(Self::INITIAL_RESERVE),
                builder,
            ),
            stream_count: 0,
            offset:       0,
        })
    }

    /// Adds one occurrence of `item`.
    ///
    /// Counters are incremented with plain addition; use
    /// [`update_checked`](Self::update_checked) with narrow counter types.
    pub fn update(&mut self, item: K) {
        if let Some(count) = self.counters.get_mut(&item) {
            *count = *count + C::one();
        } else if self.counters.len() < self.capacity {
            self.counters.insert(item, C::one());
        } else {
            self.decrement_all();
        }

        self.stream_count += 1;
    }

    /// Returns the tracked counters.
    ///
    /// The counts are exact per-item frequencies of the retained items and
    /// are **not** differentially private. Never expose them outside of
    /// tests or debugging; release them through a
    /// [`PrivateReleaser`](crate::PrivateReleaser) instead.
    pub fn counts(&self) -> &HashMap<K, C, S> {
        &self.counters
    }

    /// Estimated frequency of `item`, zero when it is not tracked.
    ///
    /// Not differentially private, see [`counts`](Self::counts).
    pub fn estimate<Q>(&self, item: &Q) -> C
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.counters.get(item).copied().unwrap_or_else(C::zero)
    }

    /// Same as [`estimate`](Self::estimate); pairs with
    /// [`upper_bound`](Self::upper_bound).
    pub fn lower_bound<Q>(&self, item: &Q) -> C
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.estimate(item)
    }

    pub fn upper_bound<Q>(&self, item: &Q) -> u64
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.estimate(item).as_() + self.offset
    }

    /// Largest possible underestimation of any item's frequency.
    ///
    /// Never exceeds `stream_count / (capacity + 1)`.
    pub fn maximum_error(&self) -> u64 {
        self.offset
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stream_count(&self) -> u64 {
        self.stream_count
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn contains<Q>(&self, item: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.counters.contains_key(item)
    }

    pub fn clear(&mut self) {
        self.counters.clear();
        self.stream_count = 0;
        self.offset = 0;
    }

    pub fn check_compatible_with(
        &self,
        other: &MisraGries<K, C, S>,
    ) -> Result<(), MisraGriesError> {
        if self.capacity != other.capacity {
            return Err(MisraGriesError::IncompatibleCapacity);
        }

        Ok(())
    }

    fn decrement_all(&mut self) {
        self.counters.retain(|_, count| {
            *count = *count - C::one();

            !count.is_zero()
        });

        self.offset += 1;

        trace!(
            stream_count = self.stream_count,
            tracked = self.counters.len(),
            "decremented all counters"
        );
    }
}

impl<K, C, S> MisraGries<K, C, S>
where
    K: Hash + Eq,
    C: Copy + Ord + Unsigned + AsPrimitive<u64> + CheckedAdd,
    S: BuildHasher,
{
    /// Like [`update`](Self::update), but fails instead of overflowing the
    /// counter. The sketch is left untouched on failure.
    pub fn update_checked(&mut self, item: K) -> Result<(), MisraGriesError> {
        if let Some(count) = self.counters.get_mut(&item) {
            *count = count
                .checked_add(&C::one())
                .ok_or(MisraGriesError::CounterOverflow)?;
        } else if self.counters.len() < self.capacity {
            self.counters.insert(item, C::one());
        } else {
            self.decrement_all();
        }

        self.stream_count += 1;

        Ok(())
    }

    /// Merges `other` into this sketch.
    ///
    /// Counters are summed. If more than `capacity` remain, the
    /// `capacity + 1`-th largest count is subtracted from all of them and
    /// the non-positive ones are dropped, which keeps the error bound of
    /// the combined stream.
    pub fn merge(
        &mut self,
        other: &MisraGries<K, C, S>,
    ) -> Result<(), MisraGriesError>
    where
        K: Clone,
    {
        self.check_compatible_with(other)?;

        for (item, count) in other.counters.iter() {
            if let Some(current) = self.counters.get(item) {
                current
                    .checked_add(count)
                    .ok_or(MisraGriesError::CounterOverflow)?;
            }
        }

        let stream_count = self
            .stream_count
            .checked_add(other.stream_count)
            .ok_or(MisraGriesError::CounterOverflow)?;

        for (item, &count) in other.counters.iter() {
            let current =
                self.counters.entry(item.clone()).or_insert_with(C::zero);

            *current = *current + count;
        }

        self.stream_count = stream_count;
        self.offset += other.offset;

        if self.counters.len() > self.capacity {
            let mut counts: Vec<C> = self.counters.values().copied().collect();

            let (_, pivot, _) =
                counts.select_nth_unstable_by(self.capacity, |a, b| b.cmp(a));
            let pivot = *pivot;

            self.counters.retain(|_, count| {
                if *count > pivot {
                    *count = *count - pivot;

                    true
                } else {
                    false
                }
            });

            self.offset += pivot.as_();
        }

        Ok(())
    }
}
