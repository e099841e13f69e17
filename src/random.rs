//! Injectable random source for cache-bypass draws and top-N selection.

use rand::Rng;
use std::sync::Mutex;

pub trait RandomSource: Send + Sync {
    /// Uniform draw in `[0.0, 1.0)`.
    fn next_f64(&self) -> f64;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn pick_index(&self, len: usize) -> usize;
}

/// Production source backed by the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::rng().random::<f64>()
    }

    fn pick_index(&self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        rand::rng().random_range(0..len)
    }
}

/// Deterministic source replaying a fixed script; cycles when exhausted.
///
/// Floats and indices come from separate scripts so tests can pin each kind
/// of draw independently.
#[derive(Debug)]
pub struct SequenceRandom {
    floats: Vec<f64>,
    indices: Vec<usize>,
    cursor: Mutex<(usize, usize)>,
}

impl SequenceRandom {
    pub fn new(floats: Vec<f64>, indices: Vec<usize>) -> Self {
        Self {
            floats,
            indices,
            cursor: Mutex::new((0, 0)),
        }
    }

    /// Always returns the same float and index.
    pub fn constant(float: f64, index: usize) -> Self {
        Self::new(vec![float], vec![index])
    }
}

impl RandomSource for SequenceRandom {
    fn next_f64(&self) -> f64 {
        if self.floats.is_empty() {
            return 0.0;
        }
        let mut cur = self.cursor.lock().unwrap_or_else(|p| p.into_inner());
        let v = self.floats[cur.0 % self.floats.len()];
        cur.0 += 1;
        v
    }

    fn pick_index(&self, len: usize) -> usize {
        if len == 0 || self.indices.is_empty() {
            return 0;
        }
        let mut cur = self.cursor.lock().unwrap_or_else(|p| p.into_inner());
        let v = self.indices[cur.1 % self.indices.len()];
        cur.1 += 1;
        v % len
    }
}
