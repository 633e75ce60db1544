//! Filter sizing from an expected item count and a target false-positive rate.
//!
//!   m = ceil(-n * ln(p) / ln(2)^2)
//!   k = ceil(m * ln(2) / n)

use crate::consts::MAX_BIT_COUNT;
use crate::errors::{CcbfError, Result};
use serde::Serialize;
use std::f64::consts::LN_2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FilterParams {
    pub bit_count: u32,
    pub hash_count: u32,
}

pub fn derive(expected_items: usize, false_positive_rate: f64) -> Result<FilterParams> {
    if expected_items == 0 {
        return Err(CcbfError::InvalidParameter("expected item count must be positive".into()));
    }
    if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
        return Err(CcbfError::InvalidParameter(format!(
            "false positive rate must be in (0, 1), got {false_positive_rate}"
        )));
    }

    let n = expected_items as f64;
    let m = (-n * false_positive_rate.ln() / (LN_2 * LN_2)).ceil().max(1.0);
    if m > MAX_BIT_COUNT as f64 {
        return Err(CcbfError::InvalidParameter(format!(
            "{expected_items} items at p={false_positive_rate} need {m} bits, more than {MAX_BIT_COUNT}"
        )));
    }
    let bit_count = m as u32;
    let hash_count = (bit_count as f64 * LN_2 / n).ceil().max(1.0) as u32;

    Ok(FilterParams { bit_count, hash_count })
}

/// Expected false-positive rate after `n` distinct inserts: (1 - e^(-kn/m))^k
pub fn false_positive_rate(bit_count: u32, items: usize, hash_count: u32) -> f64 {
    if bit_count == 0 {
        return 1.0;
    }
    let exponent = -(hash_count as f64) * (items as f64) / (bit_count as f64);
    (1.0 - exponent.exp()).powi(hash_count as i32)
}
