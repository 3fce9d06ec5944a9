//! A differentially private Misra-Gries sketch for summarizing data
//! streams.
//!
//! Misra-Gries is a *bounded space* data structure for approximating item
//! frequencies. It keeps at most `capacity` counters and never
//! overestimates: every estimate is at most the true frequency and at
//! least the true frequency minus `n / (capacity + 1)` after `n` updates.
//!
//! The counters themselves reveal exact per-item information. A noisy,
//! thresholded histogram that satisfies (ε, δ)-differential privacy is
//! obtained with a [`PrivateReleaser`], following C. Lebeda and J. Tětek,
//! *Better Differentially Private Approximate Histograms and Heavy
//! Hitters using the Misra-Gries Sketch*.
//!
//! Current implementations:
//!
//! * [`MisraGries`]
//! * [`PrivateReleaser`]
//!
//! ```
//! use dpmisragries::{MisraGries, PrivateReleaser};
//!
//! let mut sketch: MisraGries<&str> = MisraGries::new(2).unwrap();
//!
//! for item in &["a", "b", "a", "c", "a"] {
//!     sketch.update(*item);
//! }
//!
//! let mut releaser = PrivateReleaser::from_seed(7);
//!
//! let histogram = releaser.release(&sketch, 1.0, 0.1).unwrap();
//!
//! assert!(!histogram.contains(&"c"));
//! ```

use std::error;
use std::fmt;

mod misragries;
mod noise;
mod release;

pub use misragries::MisraGries;
pub use noise::{NoiseSource, PermutationSource, RngSource};
pub use release::{release_threshold, PrivateHistogram, PrivateReleaser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    Capacity,
    Epsilon,
    Delta,
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Capacity => "capacity".fmt(f),
            Parameter::Epsilon => "epsilon".fmt(f),
            Parameter::Delta => "delta".fmt(f),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum MisraGriesError {
    InvalidParameter(Parameter),
    CounterOverflow,
    IncompatibleCapacity,
}

impl fmt::Display for MisraGriesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MisraGriesError::InvalidParameter(parameter) => {
                write!(f, "invalid parameter: {}.", parameter)
            },
            MisraGriesError::CounterOverflow => "counter overflow.".fmt(f),
            MisraGriesError::IncompatibleCapacity => {
                "incompatible capacity.".fmt(f)
            },
        }
    }
}

impl error::Error for MisraGriesError {}
