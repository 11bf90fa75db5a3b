//! Header discovery: reads the first four bytes of the archive, follows
//! the optional user-data wrapper, and returns a unified [`ArchiveHeader`]
//! carrying the absolute on-disk offset of the archive body.

use crate::error::{Error, Result};
use nom::bytes::complete::tag;
use nom::number::complete::{i16, i64, u16, u32};
use nom::IResult;
use std::io::{Read, Seek, SeekFrom};

/// Magic for the classic archive header.
pub const MAGIC_HEADER: &[u8; 4] = b"MPQ\x1a";
/// Magic for the user-data-prefixed variant.
pub const MAGIC_USER_DATA: &[u8; 4] = b"MPQ\x1b";

const LE: nom::number::Endianness = nom::number::Endianness::Little;

/// Sane ceiling on `sector_size_shift`: 512 << 23 is already 4 GiB per
/// sector, far past anything a real archive uses.
const MAX_SECTOR_SIZE_SHIFT: u16 = 23;

/// Fields only present when `format_version == 1`, widening the 32-bit
/// table offsets to 48 bits for large archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct ExtendedHeader {
    /// Offset to a separate extended (hi-)block table; not consumed by
    /// this reader (no archive in scope here uses files large enough to
    /// need it), but preserved for completeness and introspection.
    pub extended_block_table_offset: i64,
    /// High 16 bits of the hash table offset.
    pub hash_table_offset_high: i16,
    /// High 16 bits of the block table offset.
    pub block_table_offset_high: i16,
}

impl ExtendedHeader {
    fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, extended_block_table_offset) = i64(LE)(input)?;
        let (input, hash_table_offset_high) = i16(LE)(input)?;
        let (input, block_table_offset_high) = i16(LE)(input)?;
        Ok((
            input,
            Self {
                extended_block_table_offset,
                hash_table_offset_high,
                block_table_offset_high,
            },
        ))
    }
}

/// The unified archive header: classic fields plus, for format version 1,
/// the extended widening fields.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct ArchiveHeader {
    /// Absolute file offset of the archive body. Zero for the classic
    /// layout; equal to `mpq_header_offset` for the user-data-prefixed
    /// layout.
    pub base_offset: u64,
    pub header_size: u32,
    pub archive_size: u32,
    pub format_version: u16,
    pub sector_size_shift: u16,
    pub(crate) hash_table_offset_low: u32,
    pub(crate) block_table_offset_low: u32,
    pub hash_table_entries: u32,
    pub block_table_entries: u32,
    pub extended: Option<ExtendedHeader>,
}

impl ArchiveHeader {
    /// Logical sector size: `512 << sector_size_shift`.
    pub fn sector_size(&self) -> u32 {
        512u32 << self.sector_size_shift
    }

    /// 48-bit absolute hash table offset, relative to `base_offset`.
    pub fn hash_table_offset(&self) -> u64 {
        let high = self
            .extended
            .map(|e| e.hash_table_offset_high as u16 as u64)
            .unwrap_or(0);
        (high << 32) | self.hash_table_offset_low as u64
    }

    /// 48-bit absolute block table offset, relative to `base_offset`.
    pub fn block_table_offset(&self) -> u64 {
        let high = self
            .extended
            .map(|e| e.block_table_offset_high as u16 as u64)
            .unwrap_or(0);
        (high << 32) | self.block_table_offset_low as u64
    }
}

struct ClassicFields {
    header_size: u32,
    archive_size: u32,
    format_version: u16,
    sector_size_shift: u16,
    hash_table_offset_low: u32,
    block_table_offset_low: u32,
    hash_table_entries: u32,
    block_table_entries: u32,
}

fn parse_classic_fields(input: &[u8]) -> IResult<&[u8], ClassicFields> {
    let (input, _) = tag(MAGIC_HEADER.as_slice())(input)?;
    let (input, header_size) = u32(LE)(input)?;
    let (input, archive_size) = u32(LE)(input)?;
    let (input, format_version) = u16(LE)(input)?;
    let (input, sector_size_shift) = u16(LE)(input)?;
    let (input, hash_table_offset_low) = u32(LE)(input)?;
    let (input, block_table_offset_low) = u32(LE)(input)?;
    let (input, hash_table_entries) = u32(LE)(input)?;
    let (input, block_table_entries) = u32(LE)(input)?;
    Ok((
        input,
        ClassicFields {
            header_size,
            archive_size,
            format_version,
            sector_size_shift,
            hash_table_offset_low,
            block_table_offset_low,
            hash_table_entries,
            block_table_entries,
        },
    ))
}

fn parse_user_data_fields(input: &[u8]) -> IResult<&[u8], (u32, u32, u32)> {
    let (input, _) = tag(MAGIC_USER_DATA.as_slice())(input)?;
    let (input, user_data_size) = u32(LE)(input)?;
    let (input, mpq_header_offset) = u32(LE)(input)?;
    let (input, user_data_header_size) = u32(LE)(input)?;
    Ok((
        input,
        (user_data_size, mpq_header_offset, user_data_header_size),
    ))
}

/// The opaque user-data block attached ahead of the archive body in the
/// `MPQ\x1b`-prefixed variant.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct UserData {
    pub user_data_size: u32,
    /// Absolute offset of the archive header, equal to the unified
    /// header's `base_offset`.
    pub archive_header_offset: u32,
    #[serde(skip)]
    pub content: Vec<u8>,
}

fn read_classic_header<R: Read + Seek>(src: &mut R, base_offset: u64) -> Result<ArchiveHeader> {
    src.seek(SeekFrom::Start(base_offset))?;
    let mut buf = [0u8; 32];
    src.read_exact(&mut buf)
        .map_err(|e| Error::malformed(format!("truncated archive header: {e}")))?;
    let (_, fields) = parse_classic_fields(&buf)?;

    if fields.sector_size_shift > MAX_SECTOR_SIZE_SHIFT {
        return Err(Error::malformed(format!(
            "sector_size_shift {} exceeds ceiling of {MAX_SECTOR_SIZE_SHIFT}",
            fields.sector_size_shift
        )));
    }

    let mut header = ArchiveHeader {
        base_offset,
        header_size: fields.header_size,
        archive_size: fields.archive_size,
        format_version: fields.format_version,
        sector_size_shift: fields.sector_size_shift,
        hash_table_offset_low: fields.hash_table_offset_low,
        block_table_offset_low: fields.block_table_offset_low,
        hash_table_entries: fields.hash_table_entries,
        block_table_entries: fields.block_table_entries,
        extended: None,
    };

    if header.format_version == 1 {
        let mut ext_buf = [0u8; 12];
        src.read_exact(&mut ext_buf)
            .map_err(|e| Error::malformed(format!("truncated v1 header extension: {e}")))?;
        let (_, extended) = ExtendedHeader::parse(&ext_buf)?;
        header.extended = Some(extended);
    }

    Ok(header)
}

/// Reads the archive header(s), following the user-data prefix if
/// present.
#[tracing::instrument(skip(src))]
pub fn read_header<R: Read + Seek>(src: &mut R) -> Result<(ArchiveHeader, Option<UserData>)> {
    src.seek(SeekFrom::Start(0))?;
    let mut magic = [0u8; 4];
    src.read_exact(&mut magic)
        .map_err(|e| Error::malformed(format!("file too short for a magic: {e}")))?;

    if magic == *MAGIC_HEADER {
        let header = read_classic_header(src, 0)?;
        return Ok((header, None));
    }

    if magic == *MAGIC_USER_DATA {
        let mut rest = [0u8; 12];
        src.read_exact(&mut rest)
            .map_err(|e| Error::malformed(format!("truncated user-data header: {e}")))?;
        let mut prefix = Vec::with_capacity(16);
        prefix.extend_from_slice(&magic);
        prefix.extend_from_slice(&rest);
        let (_, (user_data_size, mpq_header_offset, user_data_header_size)) =
            parse_user_data_fields(&prefix)?;

        let mut content = vec![0u8; user_data_header_size as usize];
        src.read_exact(&mut content)
            .map_err(|e| Error::malformed(format!("truncated user-data payload: {e}")))?;

        let user_data = UserData {
            user_data_size,
            archive_header_offset: mpq_header_offset,
            content,
        };
        tracing::debug!(mpq_header_offset, "found user-data prefix");

        let header = read_classic_header(src, mpq_header_offset as u64)?;
        return Ok((header, Some(user_data)));
    }

    Err(Error::malformed(format!(
        "unrecognized magic bytes: {magic:02x?}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ArchiveBuilder;
    use std::io::Cursor;

    #[test]
    fn classic_header_has_zero_base_offset() {
        let bytes = ArchiveBuilder::new().build();
        let mut cursor = Cursor::new(bytes);
        let (header, user_data) = read_header(&mut cursor).unwrap();
        assert_eq!(header.base_offset, 0);
        assert!(user_data.is_none());
    }

    #[test]
    fn user_data_prefixed_header_reports_mpq_header_offset() {
        let bytes = ArchiveBuilder::new().with_user_data(b"hello").build();
        let mut cursor = Cursor::new(bytes);
        let (header, user_data) = read_header(&mut cursor).unwrap();
        let user_data = user_data.expect("user data expected");
        assert_eq!(header.base_offset, user_data.archive_header_offset as u64);
        assert_eq!(user_data.content, b"hello");
    }

    #[test]
    fn rejects_unknown_magic() {
        let mut cursor = Cursor::new(b"JUNK0000000000000000000000000000".to_vec());
        assert!(read_header(&mut cursor).is_err());
    }

    #[test]
    fn v1_extends_table_offsets_past_32_bits() {
        let bytes = ArchiveBuilder::new()
            .with_format_version_1(0x1, 0x2)
            .build();
        let mut cursor = Cursor::new(bytes);
        let (header, _) = read_header(&mut cursor).unwrap();
        assert!(header.hash_table_offset() >= (1u64 << 32));
        assert!(header.block_table_offset() >= (1u64 << 32) * 2 / 2);
    }
}
