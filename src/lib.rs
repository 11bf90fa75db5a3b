//! Reader for MPQ (MoPaQ) archives: the container format used by
//! Blizzard's Warcraft III, Diablo II, and StarCraft titles.
//!
//! This crate covers the read path only — header discovery (classic and
//! user-data-prefixed layouts, plus the v1 48-bit offset extension), the
//! crypt table and stream cipher, filename hashing, and sectored file
//! decoding with the usual DEFLATE/BZIP2/PKWare-implode codecs. Writing
//! or repairing archives is out of scope.
//!
//! ```no_run
//! use mpq_archive::{Archive, OpenOptions};
//! use std::fs::File;
//!
//! # fn main() -> mpq_archive::Result<()> {
//! let file = File::open("example.mpq")?;
//! let mut archive = Archive::open(file, OpenOptions::default())?;
//! if let Some(bytes) = archive.read_file("(listfile)")? {
//!     println!("{} bytes", bytes.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod codec;
pub mod crypto;
pub mod error;
pub mod header;
pub mod resolver;
pub mod sector;
pub mod tables;

#[cfg(test)]
mod test_support;

pub use archive::{Archive, OpenOptions};
pub use error::{Error, Result};
pub use header::{ArchiveHeader, ExtendedHeader, UserData};
pub use tables::{BlockTableEntry, HashTableEntry};
