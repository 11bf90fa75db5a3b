//! The archive facade: ties header discovery, table reading, filename
//! resolution, and sectored decoding together into a single handle.

use crate::codec::CodecOptions;
use crate::error::{Error, Result};
use crate::header::{self, ArchiveHeader, UserData};
use crate::resolver;
use crate::sector;
use crate::tables::{self, BlockTableEntry, HashTableEntry};
use std::collections::HashMap;
use std::io::{Read, Seek, Write};

const LISTFILE: &str = "(listfile)";

/// Renders a block entry's flag bits as a comma-separated, title-cased
/// label list, e.g. `flags=0x80000200` -> `"Exists, Compress"`.
fn flag_names(flags: u32) -> String {
    use convert_case::{Case, Casing};
    use tables::{
        MPQ_FILE_COMPRESS, MPQ_FILE_DELETE_MARKER, MPQ_FILE_ENCRYPTED, MPQ_FILE_EXISTS,
        MPQ_FILE_FIX_KEY, MPQ_FILE_IMPLODE, MPQ_FILE_SECTOR_CRC, MPQ_FILE_SINGLE_UNIT,
    };

    let bits: &[(u32, &str)] = &[
        (MPQ_FILE_IMPLODE, "implode"),
        (MPQ_FILE_COMPRESS, "compress"),
        (MPQ_FILE_ENCRYPTED, "encrypted"),
        (MPQ_FILE_FIX_KEY, "fix_key"),
        (MPQ_FILE_SINGLE_UNIT, "single_unit"),
        (MPQ_FILE_DELETE_MARKER, "delete_marker"),
        (MPQ_FILE_SECTOR_CRC, "sector_crc"),
        (MPQ_FILE_EXISTS, "exists"),
    ];
    bits.iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, name)| name.to_case(Case::Title))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Configuration for [`Archive::open`].
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Read and parse `(listfile)` at open time, populating
    /// [`Archive::files`]. Archives with no listfile leave it `None`
    /// rather than failing.
    pub load_listfile: bool,
    /// Downgrade unimplemented or failing codecs to a warning plus
    /// best-effort passthrough instead of a hard error.
    pub permissive: bool,
    /// External binary used for PKWare implode decoding.
    pub implode_decoder_bin: String,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            load_listfile: true,
            permissive: false,
            implode_decoder_bin: crate::codec::CodecOptions::default().implode_decoder_bin,
        }
    }
}

/// An open MPQ archive.
///
/// Owns its byte source exclusively; there is no concurrent-reader
/// support (see the crate's concurrency notes). All lookups are
/// single-threaded, synchronous, and blocking.
#[derive(Debug)]
pub struct Archive<R> {
    source: R,
    base_offset: u64,
    header: ArchiveHeader,
    user_data: Option<UserData>,
    hash_table: Vec<HashTableEntry>,
    block_table: Vec<BlockTableEntry>,
    files: Option<Vec<String>>,
    codec_options: CodecOptions,
}

impl<R: Read + Seek> Archive<R> {
    /// Opens an archive, reading its header and both tables eagerly.
    #[tracing::instrument(skip(source, options))]
    pub fn open(mut source: R, options: OpenOptions) -> Result<Self> {
        let (header, user_data) = header::read_header(&mut source)?;
        let base_offset = header.base_offset;

        let hash_table = tables::read_hash_table(
            &mut source,
            base_offset,
            header.hash_table_offset(),
            header.hash_table_entries,
        )?;
        let block_table = tables::read_block_table(
            &mut source,
            base_offset,
            header.block_table_offset(),
            header.block_table_entries,
        )?;

        let codec_options = CodecOptions {
            permissive: options.permissive,
            implode_decoder_bin: options.implode_decoder_bin.clone(),
        };

        let mut archive = Self {
            source,
            base_offset,
            header,
            user_data,
            hash_table,
            block_table,
            files: None,
            codec_options,
        };

        if options.load_listfile {
            if let Some(bytes) = archive.read_file_inner(LISTFILE, false)? {
                let names = String::from_utf8_lossy(&bytes)
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_owned)
                    .collect();
                archive.files = Some(names);
            } else {
                tracing::debug!("archive has no listfile");
            }
        }

        Ok(archive)
    }

    fn locate(&self, name: &str) -> Option<BlockTableEntry> {
        resolver::resolve(name, &self.hash_table, &self.block_table).copied()
    }

    fn read_file_inner(&mut self, name: &str, force_decompress: bool) -> Result<Option<Vec<u8>>> {
        let Some(block) = self.locate(name) else {
            return Ok(None);
        };
        let bytes = sector::read_file(
            &mut self.source,
            self.base_offset,
            &self.header,
            name,
            &block,
            force_decompress,
            &self.codec_options,
        )?;
        Ok(Some(bytes))
    }

    /// Reads and fully decodes `name`, or `None` if it is not present in
    /// the hash table. Absence is not an error.
    pub fn read_file(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        self.read_file_inner(name, false)
    }

    /// Like [`Archive::read_file`], but forces every sector through its
    /// decoder regardless of whether the size comparison suggests it was
    /// stored compressed. Useful when a producer's size bookkeeping is
    /// known to be unreliable.
    pub fn read_file_with(&mut self, name: &str, force_decompress: bool) -> Result<Option<Vec<u8>>> {
        self.read_file_inner(name, force_decompress)
    }

    /// Extracts `names`, or every name in the listfile if `names` is
    /// `None`. Fails if no names are given and the archive has no
    /// listfile to fall back on.
    pub fn extract(&mut self, names: Option<&[String]>) -> Result<HashMap<String, Vec<u8>>> {
        let owned;
        let names: &[String] = match names {
            Some(n) => n,
            None => match &self.files {
                Some(files) => {
                    owned = files.clone();
                    &owned
                }
                None => {
                    return Err(Error::malformed(
                        "no filename list available: archive has no (listfile) and none was given",
                    ))
                }
            },
        };

        let mut out = HashMap::with_capacity(names.len());
        for name in names {
            if let Some(bytes) = self.read_file_inner(name, false)? {
                out.insert(name.clone(), bytes);
            }
        }
        Ok(out)
    }

    pub fn files(&self) -> Option<&[String]> {
        self.files.as_deref()
    }

    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }

    pub fn hash_table(&self) -> &[HashTableEntry] {
        &self.hash_table
    }

    pub fn block_table(&self) -> &[BlockTableEntry] {
        &self.block_table
    }

    /// Dumps the header and user-data fields as pretty JSON.
    pub fn write_headers_json(&self, writer: impl Write) -> Result<()> {
        #[derive(serde::Serialize)]
        struct Dump<'a> {
            header: &'a ArchiveHeader,
            user_data: &'a Option<UserData>,
        }
        serde_json::to_writer_pretty(
            writer,
            &Dump {
                header: &self.header,
                user_data: &self.user_data,
            },
        )
        .map_err(|e| Error::malformed(format!("failed to serialize headers: {e}")))
    }

    /// Writes one line per hash table entry, skipping never-occupied
    /// slots.
    pub fn write_hash_table_text(&self, mut writer: impl Write) -> Result<()> {
        for (i, entry) in self.hash_table.iter().enumerate() {
            if entry.is_empty() {
                continue;
            }
            writeln!(
                writer,
                "{i:>6}  hash_a={:08x} hash_b={:08x} locale={:04x} platform={:04x} block={}",
                entry.hash_a, entry.hash_b, entry.locale, entry.platform, entry.block_index
            )?;
        }
        Ok(())
    }

    /// Writes one line per block table entry, with its flag bits spelled
    /// out as human-readable names.
    pub fn write_block_table_text(&self, mut writer: impl Write) -> Result<()> {
        for (i, entry) in self.block_table.iter().enumerate() {
            writeln!(
                writer,
                "{i:>6}  offset={:08x} archived_size={} size={} flags={:08x} [{}]",
                entry.offset,
                entry.archived_size,
                entry.size,
                entry.flags,
                flag_names(entry.flags)
            )?;
        }
        Ok(())
    }

    /// Writes the resolved listfile, one name per line, or nothing if
    /// the archive has none.
    pub fn write_files_text(&self, mut writer: impl Write) -> Result<()> {
        if let Some(files) = &self.files {
            for name in files {
                writeln!(writer, "{name}")?;
            }
        }
        Ok(())
    }
}
