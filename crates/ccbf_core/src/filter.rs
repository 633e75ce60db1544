//! Bloom filter over byte strings, one bool per bit.
use crate::errors::{CcbfError, Result};
use crate::hash::bit_indices;
use crate::params::{self, FilterParams};
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bloom {
    bit_count: u32,
    hash_count: u32,
    bits: Vec<bool>,
}

impl Bloom {
    /// Empty filter sized for `expected_items` at `false_positive_rate`.
    pub fn with_rate(expected_items: usize, false_positive_rate: f64) -> Result<Self> {
        let FilterParams { bit_count, hash_count } = params::derive(expected_items, false_positive_rate)?;
        debug!(expected_items, false_positive_rate, bit_count, hash_count, "sized bloom filter");
        Ok(Self { bit_count, hash_count, bits: vec![false; bit_count as usize] })
    }

    /// Rebuild from stored state. Seeds are implied by `hash_count`.
    pub fn from_parts(hash_count: u32, bits: Vec<bool>) -> Result<Self> {
        if hash_count == 0 || hash_count > crate::consts::MAX_HASH_COUNT {
            return Err(CcbfError::InvalidParameter(format!("hash count {hash_count} out of range")));
        }
        if bits.is_empty() || bits.len() > crate::consts::MAX_BIT_COUNT as usize {
            return Err(CcbfError::InvalidParameter(format!("bit count {} out of range", bits.len())));
        }
        Ok(Self { bit_count: bits.len() as u32, hash_count, bits })
    }

    pub fn bit_count(&self) -> u32 { self.bit_count }
    pub fn hash_count(&self) -> u32 { self.hash_count }
    pub fn bits(&self) -> &[bool] { &self.bits }

    pub fn insert(&mut self, item: &[u8]) {
        for idx in bit_indices(item, self.hash_count, self.bit_count) {
            self.bits[idx] = true;
        }
    }

    pub fn contains(&self, item: &[u8]) -> bool {
        bit_indices(item, self.hash_count, self.bit_count).all(|idx| self.bits[idx])
    }

    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn fill_ratio(&self) -> f64 {
        self.count_ones() as f64 / self.bit_count as f64
    }

    /// Chance that an item never inserted lands only on set bits, given the current array.
    pub fn estimated_fpr(&self) -> f64 {
        self.fill_ratio().powi(self.hash_count as i32)
    }
}
