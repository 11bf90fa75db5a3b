//! Hash table and block table: the two fixed-shape, possibly-encrypted
//! arrays that map a filename hash to the sectored bytes backing it.

use crate::crypto::{self, HashType};
use crate::error::{Error, Result};
use nom::number::complete::{u16, u32};
use nom::IResult;
use std::io::{Read, Seek, SeekFrom};

const LE: nom::number::Endianness = nom::number::Endianness::Little;
const ENTRY_SIZE: u64 = 16;

/// Sentinel `block_index` meaning the slot has never been occupied.
pub const HASH_ENTRY_EMPTY: u32 = 0xFFFF_FFFF;
/// Sentinel `block_index` meaning the slot held a file that was deleted.
pub const HASH_ENTRY_DELETED: u32 = 0xFFFF_FFFE;

pub const MPQ_FILE_IMPLODE: u32 = 0x0000_0100;
pub const MPQ_FILE_COMPRESS: u32 = 0x0000_0200;
pub const MPQ_FILE_ENCRYPTED: u32 = 0x0001_0000;
pub const MPQ_FILE_FIX_KEY: u32 = 0x0002_0000;
pub const MPQ_FILE_SINGLE_UNIT: u32 = 0x0100_0000;
pub const MPQ_FILE_DELETE_MARKER: u32 = 0x0200_0000;
pub const MPQ_FILE_SECTOR_CRC: u32 = 0x0400_0000;
pub const MPQ_FILE_EXISTS: u32 = 0x8000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct HashTableEntry {
    pub hash_a: u32,
    pub hash_b: u32,
    pub locale: u16,
    pub platform: u16,
    pub block_index: u32,
}

impl HashTableEntry {
    pub fn is_empty(&self) -> bool {
        self.block_index == HASH_ENTRY_EMPTY
    }

    pub fn is_deleted(&self) -> bool {
        self.block_index == HASH_ENTRY_DELETED
    }

    fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, hash_a) = u32(LE)(input)?;
        let (input, hash_b) = u32(LE)(input)?;
        let (input, locale) = u16(LE)(input)?;
        let (input, platform) = u16(LE)(input)?;
        let (input, block_index) = u32(LE)(input)?;
        Ok((
            input,
            Self {
                hash_a,
                hash_b,
                locale,
                platform,
                block_index,
            },
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct BlockTableEntry {
    pub offset: u32,
    pub archived_size: u32,
    pub size: u32,
    pub flags: u32,
}

impl BlockTableEntry {
    pub fn exists(&self) -> bool {
        self.flags & MPQ_FILE_EXISTS != 0 && self.archived_size > 0
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & MPQ_FILE_ENCRYPTED != 0
    }

    pub fn has_fix_key(&self) -> bool {
        self.flags & MPQ_FILE_FIX_KEY != 0
    }

    pub fn is_single_unit(&self) -> bool {
        self.flags & MPQ_FILE_SINGLE_UNIT != 0
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & MPQ_FILE_COMPRESS != 0
    }

    fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, offset) = u32(LE)(input)?;
        let (input, archived_size) = u32(LE)(input)?;
        let (input, size) = u32(LE)(input)?;
        let (input, flags) = u32(LE)(input)?;
        Ok((
            input,
            Self {
                offset,
                archived_size,
                size,
                flags,
            },
        ))
    }
}

fn read_encrypted_region<R: Read + Seek>(
    src: &mut R,
    absolute_offset: u64,
    byte_len: u64,
    key: u32,
) -> Result<Vec<u8>> {
    src.seek(SeekFrom::Start(absolute_offset))
        .map_err(|e| Error::malformed(format!("table offset out of range: {e}")))?;
    let mut raw = vec![0u8; byte_len as usize];
    src.read_exact(&mut raw)
        .map_err(|e| Error::malformed(format!("table extends past end of archive: {e}")))?;
    Ok(crypto::decrypt(&raw, key))
}

/// Reads and decrypts the hash table.
#[tracing::instrument(skip(src))]
pub fn read_hash_table<R: Read + Seek>(
    src: &mut R,
    base_offset: u64,
    table_offset: u64,
    entries: u32,
) -> Result<Vec<HashTableEntry>> {
    let key = crypto::hash("(hash table)", HashType::Table);
    let plain = read_encrypted_region(
        src,
        base_offset + table_offset,
        entries as u64 * ENTRY_SIZE,
        key,
    )?;
    plain
        .chunks_exact(ENTRY_SIZE as usize)
        .map(|chunk| {
            HashTableEntry::parse(chunk)
                .map(|(_, entry)| entry)
                .map_err(Error::from)
        })
        .collect()
}

/// Reads and decrypts the block table.
#[tracing::instrument(skip(src))]
pub fn read_block_table<R: Read + Seek>(
    src: &mut R,
    base_offset: u64,
    table_offset: u64,
    entries: u32,
) -> Result<Vec<BlockTableEntry>> {
    let key = crypto::hash("(block table)", HashType::Table);
    let plain = read_encrypted_region(
        src,
        base_offset + table_offset,
        entries as u64 * ENTRY_SIZE,
        key,
    )?;
    plain
        .chunks_exact(ENTRY_SIZE as usize)
        .map(|chunk| {
            BlockTableEntry::parse(chunk)
                .map(|(_, entry)| entry)
                .map_err(Error::from)
        })
        .collect()
}
