//! Count-min sketch.
//!
//! # Layout
//! ```text
//!            width w
//!        ┌───┬───┬───┬───┐
//! row 0  │   │ x │   │   │   cell (h1 + 0·h2) mod w
//! row 1  │ x │   │   │   │   cell (h1 + 1·h2) mod w
//!  ...   └───┴───┴───┴───┘
//! ```
//!
//! All `depth × width` counters live in one flat vector; row `i` is the
//! slice `[i·w, (i+1)·w)`. A key is hashed once with 128-bit murmur3 and the
//! two 64-bit halves derive every row's cell.
//!
//! # Thread safety
//! A sketch is not synchronized. Callers ingesting from several threads build
//! one sketch per thread (it is `Clone`) and [`merge`](CmSketch::merge) them.

use std::io::Cursor;

use crate::common::{Error, Result};

const HASH_SEED: u32 = 0;

/// Frequency estimator over byte-string keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmSketch {
    depth: usize,
    width: usize,
    total: u64,
    counters: Vec<u32>,
}

impl CmSketch {
    /// # Errors
    /// `Error::InvalidConfig` if `depth` is zero or `width` is below two
    /// (the noise floor divides by `width - 1`).
    pub fn new(depth: usize, width: usize) -> Result<Self> {
        if depth == 0 || width < 2 {
            return Err(Error::InvalidConfig(format!(
                "cm sketch needs depth >= 1 and width >= 2, got {}x{}",
                depth, width
            )));
        }
        let cells = depth.checked_mul(width).ok_or_else(|| {
            Error::InvalidConfig(format!("cm sketch {}x{} is too large", depth, width))
        })?;
        Ok(Self {
            depth,
            width,
            total: 0,
            counters: vec![0; cells],
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Sum of all inserted counts.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn insert(&mut self, key: &[u8]) -> Result<()> {
        self.insert_n(key, 1)
    }

    /// Count `key` `n` more times. Counters saturate at `u32::MAX`.
    pub fn insert_n(&mut self, key: &[u8], n: u32) -> Result<()> {
        let (h1, h2) = hash(key)?;
        self.total = self.total.saturating_add(u64::from(n));
        for row in 0..self.depth {
            let cell = self.cell(row, h1, h2);
            self.counters[cell] = self.counters[cell].saturating_add(n);
        }
        Ok(())
    }

    /// Estimated count of `key`.
    ///
    /// Each row's cell is corrected by the average load of the other cells in
    /// that row, floored at zero. The estimate is the median of the corrected
    /// rows, never more than the smallest raw cell.
    pub fn query(&self, key: &[u8]) -> Result<u64> {
        let (h1, h2) = hash(key)?;
        let mut min = u64::MAX;
        let mut corrected = Vec::with_capacity(self.depth);
        for row in 0..self.depth {
            let count = u64::from(self.counters[self.cell(row, h1, h2)]);
            min = min.min(count);
            let noise = (self.total - count.min(self.total)) / (self.width as u64 - 1);
            corrected.push(count.saturating_sub(noise));
        }
        if min == 0 {
            return Ok(0);
        }

        corrected.sort_unstable();
        let lo = corrected[(self.depth - 1) / 2];
        let hi = corrected[self.depth / 2];
        let median = lo + (hi - lo) / 2;
        Ok(median.min(min))
    }

    /// Add `other`'s counters cell by cell.
    ///
    /// # Errors
    /// `Error::DimensionMismatch` unless both sketches have the same depth
    /// and width.
    pub fn merge(&mut self, other: &CmSketch) -> Result<()> {
        if self.depth != other.depth || self.width != other.width {
            return Err(Error::DimensionMismatch(format!(
                "{}x{} vs {}x{}",
                self.depth, self.width, other.depth, other.width
            )));
        }
        for (mine, theirs) in self.counters.iter_mut().zip(&other.counters) {
            *mine = mine.saturating_add(*theirs);
        }
        self.total = self.total.saturating_add(other.total);
        Ok(())
    }

    fn cell(&self, row: usize, h1: u64, h2: u64) -> usize {
        let column = h1.wrapping_add((row as u64).wrapping_mul(h2)) % self.width as u64;
        row * self.width + column as usize
    }
}

fn hash(key: &[u8]) -> Result<(u64, u64)> {
    let h = murmur3::murmur3_x64_128(&mut Cursor::new(key), HASH_SEED)?;
    Ok((h as u64, (h >> 64) as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_bad_dimensions() {
        assert!(matches!(CmSketch::new(0, 16), Err(Error::InvalidConfig(_))));
        assert!(matches!(CmSketch::new(4, 1), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_single_key_is_exact() {
        let mut sketch = CmSketch::new(5, 64).unwrap();
        sketch.insert_n(b"alice", 7).unwrap();
        sketch.insert(b"alice").unwrap();
        assert_eq!(sketch.total(), 8);
        assert_eq!(sketch.query(b"alice").unwrap(), 8);
    }

    #[test]
    fn test_absent_key() {
        let sketch = CmSketch::new(5, 64).unwrap();
        assert_eq!(sketch.query(b"nobody").unwrap(), 0);
    }

    #[test]
    fn test_heavy_hitter_dominates() {
        let mut sketch = CmSketch::new(5, 2048).unwrap();
        for i in 0..500u32 {
            sketch.insert(format!("user-{}", i).as_bytes()).unwrap();
        }
        sketch.insert_n(b"root", 1000).unwrap();
        let estimate = sketch.query(b"root").unwrap();
        assert!(estimate <= 1000 + 500);
        assert!(estimate >= 900, "estimate {}", estimate);
    }

    #[test]
    fn test_merge() {
        let mut a = CmSketch::new(4, 128).unwrap();
        let mut b = a.clone();
        a.insert_n(b"k", 3).unwrap();
        b.insert_n(b"k", 4).unwrap();
        a.merge(&b).unwrap();
        assert_eq!(a.total(), 7);
        assert_eq!(a.query(b"k").unwrap(), 7);
    }

    #[test]
    fn test_merge_dimension_mismatch() {
        let mut a = CmSketch::new(4, 128).unwrap();
        let b = CmSketch::new(4, 64).unwrap();
        assert!(matches!(a.merge(&b), Err(Error::DimensionMismatch(_))));
    }

    proptest! {
        #[test]
        fn prop_estimate_bounded_by_min_cell(keys in proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 0..8), 1..64)) {
            let mut sketch = CmSketch::new(4, 32).unwrap();
            for key in &keys {
                sketch.insert(key).unwrap();
            }
            for key in &keys {
                let (h1, h2) = hash(key).unwrap();
                let min = (0..sketch.depth())
                    .map(|row| u64::from(sketch.counters[sketch.cell(row, h1, h2)]))
                    .min()
                    .unwrap();
                let exact = keys.iter().filter(|k| *k == key).count() as u64;
                prop_assert!(min >= exact);
                prop_assert!(sketch.query(key).unwrap() <= min);
            }
        }

        #[test]
        fn prop_merge_adds_totals(a in 0u32..1000, b in 0u32..1000) {
            let mut left = CmSketch::new(3, 16).unwrap();
            let mut right = left.clone();
            left.insert_n(b"x", a).unwrap();
            right.insert_n(b"x", b).unwrap();
            left.merge(&right).unwrap();
            prop_assert_eq!(left.total(), u64::from(a) + u64::from(b));
            prop_assert_eq!(left.query(b"x").unwrap(), u64::from(a) + u64::from(b));
        }
    }
}
