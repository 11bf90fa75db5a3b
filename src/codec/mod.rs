//! Codec dispatch: a single tag byte selects the decoder applied to a
//! stored sector's payload.

mod implode;

use crate::error::{Error, Result};
use std::io::Read;

pub const NONE: u8 = 0x00;
pub const DEFLATE: u8 = 0x02;
pub const IMPLODE: u8 = 0x08;
pub const BZIP2: u8 = 0x10;
pub const LZMA: u8 = 0x12;
pub const SPARSE: u8 = 0x20;
pub const ADPCM_MONO: u8 = 0x40;
pub const ADPCM_STEREO: u8 = 0x80;

/// Runtime knobs for the codec layer.
#[derive(Debug, Clone)]
pub struct CodecOptions {
    /// When set, an unimplemented or failing codec logs a warning and
    /// returns the sector's raw bytes instead of failing the read.
    pub permissive: bool,
    /// External binary invoked for PKWare implode, as `<bin> <in> <out>`.
    pub implode_decoder_bin: String,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            permissive: false,
            implode_decoder_bin: implode::DEFAULT_DECODER_BIN.to_string(),
        }
    }
}

fn inflate(payload: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = compress::zlib::Decoder::new(payload);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::malformed(format!("zlib stream corrupt: {e}")))?;
    Ok(out)
}

fn bunzip(payload: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = bzip2::read::BzDecoder::new(payload);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::malformed(format!("bzip2 stream corrupt: {e}")))?;
    Ok(out)
}

/// Decodes one sector's payload according to its leading tag byte.
pub fn decompress(tag: u8, payload: &[u8], options: &CodecOptions) -> Result<Vec<u8>> {
    match tag {
        NONE => Ok(payload.to_vec()),
        DEFLATE => inflate(payload),
        BZIP2 => bunzip(payload),
        IMPLODE => implode::decode(payload, &options.implode_decoder_bin).or_else(|e| {
            tracing::warn!(error = %e, "implode decoder failed, passing sector through");
            Ok(payload.to_vec())
        }),
        LZMA | SPARSE | ADPCM_MONO | ADPCM_STEREO => {
            if options.permissive {
                tracing::warn!(tag, "codec not implemented, passing sector through");
                Ok(payload.to_vec())
            } else {
                Err(Error::UnimplementedCodec(tag))
            }
        }
        other => Err(Error::UnsupportedCodec(other)),
    }
}
