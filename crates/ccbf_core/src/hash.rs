//! Seeded 32-bit hash shared by every hash function of a filter.
//!
//! Hash function `i` is MurmurHash3 (x86, 32-bit) seeded with `i`. Seeds are
//! not persisted, so this mapping is part of the file format.

use std::io::Cursor;

#[inline]
pub fn hash32(seed: u32, item: &[u8]) -> u32 {
    let mut cursor = Cursor::new(item);
    // reading from an in-memory slice cannot fail
    murmur3::murmur3_32(&mut cursor, seed).unwrap_or(0)
}

/// Bit positions probed for `item` in an array of `bit_count` bits.
#[inline]
pub fn bit_indices(item: &[u8], hash_count: u32, bit_count: u32) -> impl Iterator<Item = usize> + '_ {
    (0..hash_count).map(move |seed| (hash32(seed, item) % bit_count) as usize)
}
