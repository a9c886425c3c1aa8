use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Injected randomness for idle fidgets and puzzle seeding.
pub trait RandomSource {
    /// Uniform value in `0..=max_inclusive`.
    fn random_number(&mut self, max_inclusive: u32) -> u32;
}

#[derive(Debug)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn random_number(&mut self, max_inclusive: u32) -> u32 {
        self.rng.gen_range(0..=max_inclusive)
    }
}

/// Replays queued values (clamped to the requested range), then yields 0.
#[derive(Debug, Default)]
pub struct ScriptedRandom {
    values: VecDeque<u32>,
}

impl ScriptedRandom {
    pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    pub fn push(&mut self, value: u32) {
        self.values.push_back(value);
    }
}

impl RandomSource for ScriptedRandom {
    fn random_number(&mut self, max_inclusive: u32) -> u32 {
        self.values.pop_front().unwrap_or(0).min(max_inclusive)
    }
}
