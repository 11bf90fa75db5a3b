//! Sectored reading: splits a stored file's archived bytes into sectors,
//! decrypting and decompressing each one independently.

use crate::codec::{self, CodecOptions};
use crate::crypto::{self, HashType};
use crate::error::{Error, Result};
use crate::header::ArchiveHeader;
use crate::tables::BlockTableEntry;
use nom::number::complete::u32 as nom_u32;
use std::io::{Read, Seek, SeekFrom};

const LE: nom::number::Endianness = nom::number::Endianness::Little;

/// Derives the basename used to key a stored file's encryption, per
/// `resolve_basename`'s normalization: backslashes are treated as path
/// separators alongside forward slashes, and only the final component
/// is hashed.
pub fn resolve_basename(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

fn file_key(name: &str, block: &BlockTableEntry) -> u32 {
    let basename = resolve_basename(name);
    let raw = crypto::hash(basename, HashType::Table);
    if block.has_fix_key() {
        crypto::fix_key(raw, block.offset, block.size)
    } else {
        raw
    }
}

fn read_sector_offset_table<R: Read + Seek>(
    src: &mut R,
    absolute_offset: u64,
    slot_count: u32,
    encrypted: bool,
    key: u32,
) -> Result<Vec<u32>> {
    src.seek(SeekFrom::Start(absolute_offset))
        .map_err(|e| Error::malformed(format!("sector offset table out of range: {e}")))?;
    let mut raw = vec![0u8; slot_count as usize * 4];
    src.read_exact(&mut raw)
        .map_err(|e| Error::malformed(format!("truncated sector offset table: {e}")))?;
    if encrypted {
        raw = crypto::decrypt(&raw, key.wrapping_sub(1));
    }
    let mut offsets = Vec::with_capacity(slot_count as usize);
    let mut input = raw.as_slice();
    for _ in 0..slot_count {
        let (rest, value) = nom_u32(LE)(input)?;
        offsets.push(value);
        input = rest;
    }
    Ok(offsets)
}

/// Strips the PKWare-implode-without-flag quirk: a sector whose
/// compressed payload forgot its leading tag byte is recognizable by a
/// literal `0x00 0x06` header. Returns `(tag, payload)`.
fn sector_tag(raw: &[u8]) -> (u8, &[u8]) {
    if raw.len() >= 2 && raw[0] == 0x00 && raw[1] == 0x06 {
        (codec::IMPLODE, raw)
    } else if raw.is_empty() {
        (codec::NONE, raw)
    } else {
        (raw[0], &raw[1..])
    }
}

/// Reads and assembles the full decompressed contents of a stored file.
#[tracing::instrument(skip(src, options))]
pub fn read_file<R: Read + Seek>(
    src: &mut R,
    base_offset: u64,
    header: &ArchiveHeader,
    name: &str,
    block: &BlockTableEntry,
    force_decompress: bool,
    options: &CodecOptions,
) -> Result<Vec<u8>> {
    let absolute_offset = base_offset + block.offset as u64;
    let key = file_key(name, block);

    if block.is_single_unit() {
        src.seek(SeekFrom::Start(absolute_offset))
            .map_err(|e| Error::malformed(format!("file offset out of range: {e}")))?;
        let mut raw = vec![0u8; block.archived_size as usize];
        src.read_exact(&mut raw)
            .map_err(|e| Error::malformed(format!("truncated single-unit file: {e}")))?;
        if block.is_encrypted() {
            raw = crypto::decrypt(&raw, key);
        }
        if block.is_compressed() && (force_decompress || (block.archived_size as usize) < block.size as usize)
        {
            let (tag, payload) = sector_tag(&raw);
            return codec::decompress(tag, payload, options);
        }
        return Ok(raw);
    }

    let sector_size = header.sector_size() as u64;
    let size = block.size as u64;
    // Unconditional +1: a boundary array needs one more entry than the
    // number of sectors it delimits, and an exact multiple of
    // `sector_size` still gets a trailing, empty final sector.
    let data_sectors = size / sector_size + 1;
    let has_crc = block.flags & crate::tables::MPQ_FILE_SECTOR_CRC != 0;
    let slot_count = data_sectors + 1 + if has_crc { 1 } else { 0 };

    let offsets = read_sector_offset_table(
        src,
        absolute_offset,
        slot_count as u32,
        block.is_encrypted(),
        key,
    )?;

    let mut out = Vec::with_capacity(block.size as usize);
    let mut remaining = block.size as i64;

    for i in 0..data_sectors as usize {
        let start = offsets[i] as u64;
        let end = offsets[i + 1] as u64;
        if end < start {
            return Err(Error::malformed("sector offset table is not monotonic"));
        }
        src.seek(SeekFrom::Start(absolute_offset + start))
            .map_err(|e| Error::malformed(format!("sector offset out of range: {e}")))?;
        let mut raw = vec![0u8; (end - start) as usize];
        src.read_exact(&mut raw)
            .map_err(|e| Error::malformed(format!("truncated sector: {e}")))?;

        if block.is_encrypted() {
            raw = crypto::decrypt(&raw, key.wrapping_add(i as u32));
        }

        let is_bare_implode = raw.len() >= 2 && raw[0] == 0x00 && raw[1] == 0x06;
        let should_decompress = is_bare_implode
            || (block.is_compressed() && (force_decompress || remaining > raw.len() as i64));

        let decoded = if should_decompress {
            let (tag, payload) = sector_tag(&raw);
            codec::decompress(tag, payload, options)?
        } else {
            raw
        };

        remaining -= decoded.len() as i64;
        out.extend_from_slice(&decoded);
    }

    out.truncate(block.size as usize);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_basename_strips_directories() {
        assert_eq!(resolve_basename("units\\human\\footman.mdx"), "footman.mdx");
        assert_eq!(resolve_basename("a/b/c.txt"), "c.txt");
        assert_eq!(resolve_basename("lonefile.txt"), "lonefile.txt");
    }

    #[test]
    fn sector_tag_detects_bare_implode_header() {
        let raw = [0x00u8, 0x06, 1, 2, 3];
        let (tag, payload) = sector_tag(&raw);
        assert_eq!(tag, codec::IMPLODE);
        assert_eq!(payload, &raw[..]);
    }

    #[test]
    fn sector_tag_strips_leading_byte_otherwise() {
        let raw = [codec::DEFLATE, 9, 9, 9];
        let (tag, payload) = sector_tag(&raw);
        assert_eq!(tag, codec::DEFLATE);
        assert_eq!(payload, &raw[1..]);
    }

    #[test]
    fn bare_implode_quirk_forces_decode_even_without_compress_flag() {
        use std::io::{Cursor, Write};
        use std::os::unix::fs::PermissionsExt;

        // SOT: two u32 offsets (8, 11) bracketing a 3-byte data sector
        // that opens with the bare-implode signature.
        let mut body = Vec::new();
        body.extend_from_slice(&8u32.to_le_bytes());
        body.extend_from_slice(&11u32.to_le_bytes());
        body.extend_from_slice(&[0x00, 0x06, 0xAA]);

        let header = ArchiveHeader {
            sector_size_shift: 3,
            ..Default::default()
        };
        let block = BlockTableEntry {
            offset: 0,
            archived_size: body.len() as u32,
            size: 7,
            flags: crate::tables::MPQ_FILE_EXISTS,
        };

        // Stand-in decoder: ignores its input and writes a fixed marker,
        // so a decoded marker in the output proves the decoder was
        // actually invoked rather than the sector being passed through
        // unread. Real `read_file` callers point this at a real PKWare
        // implode binary.
        let mut script = tempfile::NamedTempFile::new().unwrap();
        writeln!(script, "#!/bin/sh\nprintf DECODED > \"$2\"").unwrap();
        let mut perms = script.as_file().metadata().unwrap().permissions();
        perms.set_mode(0o755);
        script.as_file().set_permissions(perms).unwrap();
        let options = CodecOptions {
            implode_decoder_bin: script.path().to_str().unwrap().to_string(),
            ..CodecOptions::default()
        };

        let mut cursor = Cursor::new(body);
        let result = read_file(&mut cursor, 0, &header, "test.bin", &block, false, &options);
        // No COMPRESS flag is set, so only the bare-implode signature
        // routes this sector through the decoder.
        assert_eq!(result.unwrap(), b"DECODED".to_vec());
    }

    #[test]
    fn fix_key_adjusts_by_offset_and_size() {
        let block = BlockTableEntry {
            offset: 0x100,
            archived_size: 10,
            size: 20,
            flags: crate::tables::MPQ_FILE_FIX_KEY,
        };
        let plain = file_key("file.txt", &BlockTableEntry { flags: 0, ..block });
        let fixed = file_key("file.txt", &block);
        assert_ne!(plain, fixed);
        assert_eq!(fixed, crypto::fix_key(plain, block.offset, block.size));
    }
}
