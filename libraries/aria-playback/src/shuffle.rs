//! Shuffled play order
//!
//! Shuffle never reorders the playlist itself. It keeps a Fisher-Yates
//! permutation of playlist indices with the current track first, and
//! navigation walks that permutation instead of the playlist order.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

#[derive(Debug, Clone)]
pub struct ShuffleOrder {
    order: Vec<usize>,
    rng: StdRng,
}

impl ShuffleOrder {
    /// A fixed seed makes every regenerated order reproducible
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            order: Vec::new(),
            rng,
        }
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// New permutation of `0..len`, starting with `current` when given
    pub fn regenerate(&mut self, len: usize, current: Option<usize>) {
        self.order = (0..len).collect();
        self.order.shuffle(&mut self.rng);

        if let Some(current) = current.filter(|&c| c < len) {
            if let Some(pos) = self.order.iter().position(|&i| i == current) {
                self.order.swap(0, pos);
            }
        }
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    /// Index played after `index`; wraps to the start when `wrap` is set
    pub fn next_after(&self, index: usize, wrap: bool) -> Option<usize> {
        let pos = self.order.iter().position(|&i| i == index)?;
        match self.order.get(pos + 1) {
            Some(&next) => Some(next),
            None if wrap => self.order.first().copied(),
            None => None,
        }
    }

    /// Index played before `index`; wraps to the end when `wrap` is set
    pub fn previous_before(&self, index: usize, wrap: bool) -> Option<usize> {
        let pos = self.order.iter().position(|&i| i == index)?;
        match pos.checked_sub(1) {
            Some(prev) => self.order.get(prev).copied(),
            None if wrap => self.order.last().copied(),
            None => None,
        }
    }

    pub fn first(&self) -> Option<usize> {
        self.order.first().copied()
    }
}
