//! Resolves a filename to its block table entry by scanning the hash
//! table for a matching hash pair.

use crate::crypto::{self, HashType};
use crate::tables::{BlockTableEntry, HashTableEntry};

/// Looks up `name` in `hash_table`, returning its block entry if present.
///
/// The hash table is scanned in index order for the first entry whose
/// `(hash_a, hash_b)` pair matches `name`'s. There is no computed start
/// slot and no probe: empty and deleted slots are both just slots that
/// never match and are skipped over like any other non-matching entry.
pub fn resolve<'a>(
    name: &str,
    hash_table: &[HashTableEntry],
    block_table: &'a [BlockTableEntry],
) -> Option<&'a BlockTableEntry> {
    let hash_a = crypto::hash(name, HashType::HashA);
    let hash_b = crypto::hash(name, HashType::HashB);

    for slot in hash_table {
        if slot.is_empty() || slot.is_deleted() {
            continue;
        }
        if slot.hash_a == hash_a && slot.hash_b == hash_b {
            let block = block_table.get(slot.block_index as usize)?;
            return block.exists().then_some(block);
        }
    }
    None
}
