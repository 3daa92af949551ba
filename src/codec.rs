//! Container codec: gzip stream <-> UTF-8 text.
//!
//! Saves are a single gzip member holding the loose-JSON body. The host
//! loader may inspect the header's file-name field, so decoding reports it
//! and encoding always writes one.

use flate2::read::GzDecoder;
use flate2::{Compression, GzBuilder};
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("corrupt container: {0}")]
    CorruptContainer(std::io::Error),

    #[error("container body is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("failed to write container: {0}")]
    Io(#[from] std::io::Error),
}

/// Decoded container body plus the header name it carried, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub inner_name: Option<String>,
}

/// Inflate a gzip stream and decode its body as UTF-8.
pub fn decode(bytes: &[u8]) -> Result<Decoded, CodecError> {
    let mut decoder = GzDecoder::new(bytes);
    let mut raw = Vec::new();
    decoder
        .read_to_end(&mut raw)
        .map_err(CodecError::CorruptContainer)?;

    // An empty input reads as zero bytes without ever producing a header.
    let header = decoder.header().ok_or_else(|| {
        CodecError::CorruptContainer(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "missing gzip header",
        ))
    })?;
    let inner_name = header
        .filename()
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .filter(|name| !name.is_empty());

    let text = String::from_utf8(raw)?;
    Ok(Decoded { text, inner_name })
}

/// Deflate `text` into a gzip stream whose header names `inner_name`.
///
/// When no hint is given the file's base name is embedded instead.
pub fn encode(text: &str, inner_name: Option<&str>, file: &Path) -> Result<Vec<u8>, CodecError> {
    let name = match inner_name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    let mut encoder = GzBuilder::new()
        .filename(name.into_bytes())
        .write(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes())?;
    Ok(encoder.finish()?)
}
