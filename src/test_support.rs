//! Synthetic MPQ archive construction, used only by unit and integration
//! tests. Builds byte vectors field-by-field rather than embedding fixed
//! binary fixtures, so each test can isolate the one header or table
//! quirk it cares about.

/// Builds a minimal but well-formed archive image.
///
/// Defaults to format version 0, an empty hash/block table, and no body.
/// Callers layer on `with_*` calls for the parts their test exercises.
pub struct ArchiveBuilder {
    format_version: u16,
    sector_size_shift: u16,
    hash_table_entries: u32,
    block_table_entries: u32,
    hash_table_offset: u32,
    block_table_offset: u32,
    extended: Option<(i16, i16)>,
    user_data: Option<Vec<u8>>,
    body: Vec<u8>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            format_version: 0,
            sector_size_shift: 3,
            hash_table_entries: 0,
            block_table_entries: 0,
            hash_table_offset: 0,
            block_table_offset: 0,
            extended: None,
            user_data: None,
            body: Vec::new(),
        }
    }

    /// Wraps the archive in a `MPQ\x1b` user-data prefix carrying `content`.
    pub fn with_user_data(mut self, content: &[u8]) -> Self {
        self.user_data = Some(content.to_vec());
        self
    }

    /// Sets `format_version = 1` and attaches the v1 extension with the
    /// given high halves for the hash/block table offsets.
    pub fn with_format_version_1(mut self, hash_table_offset_high: i16, block_table_offset_high: i16) -> Self {
        self.format_version = 1;
        self.extended = Some((hash_table_offset_high, block_table_offset_high));
        self
    }

    pub fn with_hash_table_offset(mut self, offset: u32, entries: u32) -> Self {
        self.hash_table_offset = offset;
        self.hash_table_entries = entries;
        self
    }

    pub fn with_block_table_offset(mut self, offset: u32, entries: u32) -> Self {
        self.block_table_offset = offset;
        self.block_table_entries = entries;
        self
    }

    pub fn with_sector_size_shift(mut self, shift: u16) -> Self {
        self.sector_size_shift = shift;
        self
    }

    /// Appends raw bytes after the header. Table offsets passed to
    /// `with_hash_table_offset`/`with_block_table_offset` are absolute
    /// from the archive's base offset, so callers padding the body
    /// themselves must account for the header's own size.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    fn header_size(&self) -> u32 {
        if self.extended.is_some() {
            44
        } else {
            32
        }
    }

    fn build_header(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(44);
        out.extend_from_slice(b"MPQ\x1a");
        out.extend_from_slice(&self.header_size().to_le_bytes());
        let archive_size = self.header_size() + self.body.len() as u32;
        out.extend_from_slice(&archive_size.to_le_bytes());
        out.extend_from_slice(&self.format_version.to_le_bytes());
        out.extend_from_slice(&self.sector_size_shift.to_le_bytes());
        out.extend_from_slice(&self.hash_table_offset.to_le_bytes());
        out.extend_from_slice(&self.block_table_offset.to_le_bytes());
        out.extend_from_slice(&self.hash_table_entries.to_le_bytes());
        out.extend_from_slice(&self.block_table_entries.to_le_bytes());
        if let Some((hash_high, block_high)) = self.extended {
            out.extend_from_slice(&0i64.to_le_bytes());
            out.extend_from_slice(&hash_high.to_le_bytes());
            out.extend_from_slice(&block_high.to_le_bytes());
        }
        out
    }

    pub fn build(self) -> Vec<u8> {
        let mut archive = self.build_header();
        archive.extend_from_slice(&self.body);

        match &self.user_data {
            None => archive,
            Some(content) => {
                let mut out = Vec::with_capacity(16 + content.len() + archive.len());
                out.extend_from_slice(b"MPQ\x1b");
                let mpq_header_offset = (16 + content.len()) as u32;
                out.extend_from_slice(&mpq_header_offset.to_le_bytes());
                out.extend_from_slice(&mpq_header_offset.to_le_bytes());
                out.extend_from_slice(&(content.len() as u32).to_le_bytes());
                out.extend_from_slice(content);
                out.extend_from_slice(&archive);
                out
            }
        }
    }
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}
