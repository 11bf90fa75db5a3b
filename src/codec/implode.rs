//! Adapter for PKWare DCL "implode" decompression.
//!
//! The core does not implement the implode algorithm itself — its LZ77
//! plus Shannon-Fano variant has no commonly used pure-Rust crate — so
//! this shells out to an external decoder binary, the same strategy the
//! Python reference reader uses via a subprocess. The binary name is
//! configurable so callers can point at whatever decoder they have
//! installed.

use crate::error::{Error, Result};
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

/// Name of the external decoder invoked as `<bin> <input> <output>`.
pub const DEFAULT_DECODER_BIN: &str = "mpq_implode_decode";

pub fn decode(payload: &[u8], decoder_bin: &str) -> Result<Vec<u8>> {
    let mut input = NamedTempFile::new()?;
    input.write_all(payload)?;
    let output = NamedTempFile::new()?;

    let output_result = Command::new(decoder_bin)
        .arg(input.path())
        .arg(output.path())
        .stderr(std::process::Stdio::piped())
        .output()
        .map_err(|e| Error::ExternalCodecFailure(format!("failed to spawn {decoder_bin}: {e}")))?;

    if !output_result.status.success() {
        let stderr = String::from_utf8_lossy(&output_result.stderr);
        return Err(Error::ExternalCodecFailure(format!(
            "{decoder_bin} exited with {}: {stderr}",
            output_result.status
        )));
    }

    std::fs::read(output.path())
        .map_err(|e| Error::ExternalCodecFailure(format!("reading decoder output: {e}")))
}
