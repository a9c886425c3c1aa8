use crate::random::RandomSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleEntry<T> {
    pub weight: u32,
    pub target: T,
}

/// Weighted fidget targets for an idle loop.
pub type IdleTable<T> = &'static [IdleEntry<T>];

/// Picks an entry with probability `weight / sum(weights)`.
///
/// Empty or zero-weight tables pick nothing and consume no randomness.
pub fn pick_weighted<T: Copy>(table: &[IdleEntry<T>], rng: &mut dyn RandomSource) -> Option<T> {
    let total: u32 = table.iter().map(|entry| entry.weight).sum();
    if total == 0 {
        return None;
    }
    let mut roll = rng.random_number(total - 1);
    for entry in table {
        if roll < entry.weight {
            return Some(entry.target);
        }
        roll -= entry.weight;
    }
    None
}

/// Ticks until the next idle fidget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FidgetTimer {
    remaining: u32,
}

impl FidgetTimer {
    pub const MIN_TICKS: u32 = 24;
    pub const SPAN_TICKS: u32 = 64;

    pub fn seeded(rng: &mut dyn RandomSource) -> Self {
        Self {
            remaining: Self::MIN_TICKS + rng.random_number(Self::SPAN_TICKS),
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Counts one tick down. Returns true on the tick the timer expires.
    pub fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.remaining == 0
    }
}

impl Default for FidgetTimer {
    fn default() -> Self {
        Self {
            remaining: Self::MIN_TICKS,
        }
    }
}
