//! Injectable random source for throw planning.
//!
//! - `StdThrowRng`: wraps `rand::rngs::StdRng`, seeded from entropy or a u64
//! - `SequenceRng`: replays a fixed list of unit samples, for deterministic tests
//!
//! The planner only ever asks for uniform samples in [0, 1); everything else
//! is derived from that.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::Real;

pub trait ThrowRng {
    /// Uniform sample in [0.0, 1.0).
    fn next_unit(&mut self) -> Real;

    /// Uniform sample in [-half, half).
    fn symmetric(&mut self, half: Real) -> Real {
        (self.next_unit() - 0.5) * 2.0 * half
    }

    /// Uniform sample in [lo, hi).
    fn range(&mut self, lo: Real, hi: Real) -> Real {
        lo + self.next_unit() * (hi - lo)
    }
}

impl<R: ThrowRng + ?Sized> ThrowRng for &mut R {
    fn next_unit(&mut self) -> Real {
        (**self).next_unit()
    }
}

pub struct StdThrowRng {
    inner: StdRng,
}

impl StdThrowRng {
    pub fn from_entropy() -> Self {
        Self {
            inner: StdRng::from_entropy(),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }
}

impl ThrowRng for StdThrowRng {
    fn next_unit(&mut self) -> Real {
        self.inner.gen::<Real>()
    }
}

/// Cycles through a fixed list of samples.
#[derive(Clone, Debug)]
pub struct SequenceRng {
    samples: Vec<Real>,
    cursor: usize,
}

impl SequenceRng {
    /// Samples are clamped into [0, 1). An empty list behaves as a constant 0.5.
    pub fn new(samples: Vec<Real>) -> Self {
        let samples = if samples.is_empty() {
            vec![0.5]
        } else {
            samples
                .into_iter()
                .map(|s| s.clamp(0.0, 1.0 - Real::EPSILON))
                .collect()
        };
        Self { samples, cursor: 0 }
    }

    pub fn constant(sample: Real) -> Self {
        Self::new(vec![sample])
    }

    /// Samples drawn so far.
    pub fn drawn(&self) -> usize {
        self.cursor
    }
}

impl ThrowRng for SequenceRng {
    fn next_unit(&mut self) -> Real {
        let s = self.samples[self.cursor % self.samples.len()];
        self.cursor += 1;
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_rng_in_range() {
        let mut rng = StdThrowRng::from_seed(7);
        for _ in 0..1000 {
            let u = rng.next_unit();
            assert!((0.0..1.0).contains(&u));
            let s = rng.symmetric(3.0);
            assert!((-3.0..3.0).contains(&s));
        }
    }

    #[test]
    fn test_std_rng_seed_repeats() {
        let mut a = StdThrowRng::from_seed(42);
        let mut b = StdThrowRng::from_seed(42);
        for _ in 0..16 {
            assert_eq!(a.next_unit(), b.next_unit());
        }
    }

    #[test]
    fn test_sequence_cycles() {
        let mut rng = SequenceRng::new(vec![0.0, 0.25, 0.75]);
        let drawn: Vec<Real> = (0..5).map(|_| rng.next_unit()).collect();
        assert_eq!(drawn, vec![0.0, 0.25, 0.75, 0.0, 0.25]);
        assert_eq!(rng.drawn(), 5);
    }

    #[test]
    fn test_sequence_helpers() {
        let mut rng = SequenceRng::constant(0.5);
        assert_eq!(rng.symmetric(10.0), 0.0);
        assert_eq!(rng.range(2.0, 4.0), 3.0);
        let mut empty = SequenceRng::new(Vec::new());
        assert_eq!(empty.next_unit(), 0.5);
    }
}
