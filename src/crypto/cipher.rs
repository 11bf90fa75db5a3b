//! The MPQ stream cipher. Used both for keyed-table decryption (hash and
//! block tables) and for sector decryption with a per-sector derived key.
//!
//! The cipher is stateful, not an involution: decrypting twice with the
//! same key does not recover the plaintext. Only the paired
//! encrypt/decrypt routines round-trip.

use super::table::crypt_table;

/// Decrypts `buf` in place, conceptually, returning a new buffer.
///
/// `buf`'s length need not be a multiple of 4: any trailing partial word
/// is passed through unchanged, matching the legacy behavior where the
/// cipher only ever runs over 4-byte-aligned table and sector-offset
/// regions and a short tail is left untouched.
pub fn decrypt(buf: &[u8], key: u32) -> Vec<u8> {
    let table = crypt_table();
    let mut s1 = key;
    let mut s2: u32 = 0xEEEE_EEEE;
    let mut out = Vec::with_capacity(buf.len());

    let mut chunks = buf.chunks_exact(4);
    for word in &mut chunks {
        s2 = s2.wrapping_add(table[(0x400 + (s1 & 0xFF)) as usize]);
        let w = u32::from_le_bytes(word.try_into().unwrap());
        let v = w ^ s1.wrapping_add(s2);

        s1 = ((!s1).wrapping_shl(0x15)).wrapping_add(0x1111_1111) | (s1 >> 0x0B);
        s2 = v
            .wrapping_add(s2)
            .wrapping_add(s2 << 5)
            .wrapping_add(3);

        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(chunks.remainder());
    out
}

/// Inverse of [`decrypt`]: the paired encryptor used only to validate the
/// cipher's round-trip property in tests. Not part of the archive-reading
/// surface (writing/modifying archives is out of scope).
#[cfg(test)]
fn encrypt(buf: &[u8], key: u32) -> Vec<u8> {
    let table = crypt_table();
    let mut s1 = key;
    let mut s2: u32 = 0xEEEE_EEEE;
    let mut out = Vec::with_capacity(buf.len());

    let mut chunks = buf.chunks_exact(4);
    for word in &mut chunks {
        s2 = s2.wrapping_add(table[(0x400 + (s1 & 0xFF)) as usize]);
        let plain = u32::from_le_bytes(word.try_into().unwrap());
        let v = plain ^ s1.wrapping_add(s2);

        s1 = ((!s1).wrapping_shl(0x15)).wrapping_add(0x1111_1111) | (s1 >> 0x0B);
        s2 = plain
            .wrapping_add(s2)
            .wrapping_add(s2 << 5)
            .wrapping_add(3);

        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(chunks.remainder());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrypt_is_not_an_involution() {
        let key = 0x1234_5678;
        let plain = [1u32, 2, 3, 4]
            .iter()
            .flat_map(|v: &u32| v.to_le_bytes())
            .collect::<Vec<u8>>();
        let once = decrypt(&plain, key);
        let twice = decrypt(&once, key);
        assert_ne!(twice, plain);
    }

    #[test]
    fn encrypt_decrypt_round_trips() {
        let key = 0xCAFE_BABE;
        let plain: Vec<u8> = (0..64u8).collect();
        let cipher = encrypt(&plain, key);
        let recovered = decrypt(&cipher, key);
        assert_eq!(recovered, plain);
    }

    #[test]
    fn passes_through_trailing_partial_word() {
        let key = 0xDEAD_BEEF;
        let mut plain = vec![1, 2, 3, 4, 5, 6];
        let out = decrypt(&plain, key);
        assert_eq!(&out[4..], &plain[4..]);
        plain.truncate(4);
        assert_eq!(&out[..4], decrypt(&plain, key).as_slice());
    }
}
