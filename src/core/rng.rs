use std::f64::consts::TAU;

use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// Source of standard normal variates for the path simulator.
pub trait NormalSampler {
    fn next_standard_normal(&mut self) -> f64;
}

impl<S: NormalSampler + ?Sized> NormalSampler for &mut S {
    fn next_standard_normal(&mut self) -> f64 {
        (**self).next_standard_normal()
    }
}

/// Box–Muller transform over any uniform generator. Each pair of uniforms
/// yields two variates; the second one is cached for the next call.
pub struct BoxMuller<R> {
    rng: R,
    cached: Option<f64>,
}

impl<R: RngCore> BoxMuller<R> {
    pub fn new(rng: R) -> Self {
        Self { rng, cached: None }
    }
}

impl BoxMuller<Pcg64Mcg> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(Pcg64Mcg::seed_from_u64(seed))
    }
}

impl<R: RngCore> NormalSampler for BoxMuller<R> {
    fn next_standard_normal(&mut self) -> f64 {
        if let Some(z) = self.cached.take() {
            return z;
        }

        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen_range(0.0..1.0);
        let radius = (-2.0 * u1.ln()).sqrt();
        let (sin, cos) = (TAU * u2).sin_cos();

        self.cached = Some(radius * sin);
        radius * cos
    }
}

/// Replays a fixed list of z-values, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct FixedSequence {
    values: Vec<f64>,
    next: usize,
}

impl FixedSequence {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, next: 0 }
    }

    /// Every draw returns 0, i.e. every year earns exactly the mean return.
    pub fn zeros() -> Self {
        Self::new(vec![0.0])
    }
}

impl NormalSampler for FixedSequence {
    fn next_standard_normal(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let z = self.values[self.next];
        self.next = (self.next + 1) % self.values.len();
        z
    }
}

pub(crate) fn derive_seed(base_seed: u64, trial: u32) -> u64 {
    splitmix64(base_seed ^ trial as u64)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
