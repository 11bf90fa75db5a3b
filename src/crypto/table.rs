//! The MPQ crypt table: a deterministic 1280-entry lookup table that
//! underlies both the filename hasher and the sector/table cipher.

use std::sync::OnceLock;

/// Logical stride between the five blocks of 256 entries.
const BLOCK_STRIDE: u32 = 0x100;

static CRYPT_TABLE: OnceLock<[u32; 1280]> = OnceLock::new();

/// Returns the process-global crypt table, building it on first use.
///
/// The table is read-only once built and freely shareable across threads
/// and archive handles (`OnceLock` gives us that for free).
pub fn crypt_table() -> &'static [u32; 1280] {
    CRYPT_TABLE.get_or_init(build_crypt_table)
}

/// Generates the crypt table from scratch.
///
/// Bit-exact with the reference MoPaQ generator: a linear congruential
/// seed advances twice per produced word, five words per row, 256 rows.
fn build_crypt_table() -> [u32; 1280] {
    let mut table = [0u32; 1280];
    let mut seed: u32 = 0x0010_0001;

    for i in 0..256u32 {
        let mut index = i;
        for _ in 0..5 {
            seed = (seed.wrapping_mul(125).wrapping_add(3)) % 0x2A_AAAB;
            let temp1 = (seed & 0xFFFF) << 16;

            seed = (seed.wrapping_mul(125).wrapping_add(3)) % 0x2A_AAAB;
            let temp2 = seed & 0xFFFF;

            table[index as usize] = temp1 | temp2;
            index += BLOCK_STRIDE;
        }
    }
    table
}
