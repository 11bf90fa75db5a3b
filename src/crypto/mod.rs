//! Crypt table, filename hasher, and stream cipher underlying the MPQ
//! table and sector encryption scheme.

mod cipher;
mod hash;
mod table;

pub use cipher::decrypt;
pub use hash::{hash, HashType};
pub use table::crypt_table;

/// Derives the base encryption key for a stored file from its basename.
///
/// `FIX_KEY`-adjusted keys are derived by the caller (the block entry's
/// offset/size are needed, which this function does not have).
pub fn file_base_key(basename: &str) -> u32 {
    hash(basename, HashType::Table)
}

/// Applies the `FIX_KEY` adjustment: `(raw_key + offset) XOR size`, all
/// 32-bit modular arithmetic.
pub fn fix_key(raw_key: u32, offset: u32, size: u32) -> u32 {
    raw_key.wrapping_add(offset) ^ size
}
