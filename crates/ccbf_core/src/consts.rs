// crates/ccbf_core/src/consts.rs

use core::mem::size_of;

pub const MAGIC_FILTER: &[u8; 4] = b"CCBF";
pub const VERSION: u16 = 1;

/// magic[4] + version[2] + hash_count[4] + bit_count[4]
pub const HDR_SIZE: usize = 14;

pub const BIT_SET: u8 = 0x01;
pub const BIT_CLEAR: u8 = 0x00;

pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.15;
pub const DEFAULT_FILTER_PATH: &str = "data/word.bf";

/// bit_count is stored as a signed 32-bit integer
pub const MAX_BIT_COUNT: u32 = i32::MAX as u32;

/// Sizing never asks for more than ~1080 hashes for any rate in (0, 1)
pub const MAX_HASH_COUNT: u32 = 2048;

const _: () = {
    assert!(HDR_SIZE == size_of::<[u8; 4]>() + size_of::<u16>() + size_of::<u32>() + size_of::<i32>());
};
