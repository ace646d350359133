// Stream- and file-level helpers for SCSU encoding/decoding.
//
// Provides `encode_stream()`/`decode_stream()` over any `Read`/`Write` pair
// and `encode_file()`/`decode_file()` wrappers with buffered file I/O.
// Optionally computes SHA-256 of the UTF-8 text side (feature-gated behind
// `file-io`).

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

#[cfg(feature = "file-io")]
use sha2::Digest;
use thiserror::Error;

use crate::codec::decoder::{DecodeError, Decoder};
use crate::codec::encoder::{EncodeError, EncodeOptions, Encoder};
use crate::source::StrictUtf8;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `encode_stream()` and `encode_file()`.
#[derive(Debug, Clone)]
pub struct EncodeStats {
    /// Scalar values encoded.
    pub chars: u64,
    /// UTF-8 input size in bytes.
    pub text_size: u64,
    /// SCSU output size in bytes.
    pub encoded_size: u64,
    /// SHA-256 of the UTF-8 input (if `file-io` feature is enabled).
    pub text_sha256: Option<[u8; 32]>,
}

/// Statistics returned by `decode_stream()` and `decode_file()`.
#[derive(Debug, Clone)]
pub struct DecodeStats {
    /// Scalar values decoded.
    pub chars: u64,
    /// SCSU input size in bytes.
    pub encoded_size: u64,
    /// UTF-8 output size in bytes.
    pub text_size: u64,
    /// SHA-256 of the UTF-8 output (if `file-io` feature is enabled).
    pub text_sha256: Option<[u8; 32]>,
}

impl EncodeStats {
    /// SCSU size relative to UTF-16 (two bytes per BMP value).
    pub fn ratio_vs_utf16(&self) -> f64 {
        if self.chars == 0 {
            return 1.0;
        }
        self.encoded_size as f64 / (2 * self.chars) as f64
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for stream and file helpers.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode UTF-8 text from `reader` as SCSU into `writer`.
///
/// The text is read fully into memory so it can be validated strictly;
/// values before a malformed sequence are written before the error is
/// returned.
pub fn encode_stream<R: Read, W: Write>(
    mut reader: R,
    writer: W,
    opts: EncodeOptions,
) -> Result<EncodeStats, IoError> {
    let mut text = Vec::new();
    reader.read_to_end(&mut text)?;

    let mut encoder = Encoder::with_options(writer, opts);
    let encoded = encoder.encode(StrictUtf8::new(&text));
    // Values accepted before a malformed sequence still reach the writer.
    encoder.flush()?;
    let chars = encoded?;
    let encoded_size = encoder.bytes_written();
    encoder.finish()?;

    log::info!("encoded {chars} values: {} -> {encoded_size} bytes", text.len());

    #[cfg(feature = "file-io")]
    let text_sha256 = Some(sha2::Sha256::digest(&text).into());
    #[cfg(not(feature = "file-io"))]
    let text_sha256: Option<[u8; 32]> = None;

    Ok(EncodeStats {
        chars,
        text_size: text.len() as u64,
        encoded_size,
        text_sha256,
    })
}

/// Encode the UTF-8 file at `input_path` into `output_path`.
pub fn encode_file(
    input_path: &Path,
    output_path: &Path,
    opts: EncodeOptions,
) -> Result<EncodeStats, IoError> {
    let reader = BufReader::with_capacity(BUF_SIZE, File::open(input_path)?);
    let writer = BufWriter::with_capacity(BUF_SIZE, File::create(output_path)?);
    encode_stream(reader, writer, opts)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode SCSU from `reader`, writing UTF-8 text to `writer`.
pub fn decode_stream<R: Read, W: Write>(reader: R, mut writer: W) -> Result<DecodeStats, IoError> {
    let mut decoder = Decoder::new(BufReader::with_capacity(BUF_SIZE, reader));
    let mut text = String::with_capacity(BUF_SIZE);
    let mut chars = 0u64;
    let mut text_size = 0u64;

    #[cfg(feature = "file-io")]
    let mut hasher = sha2::Sha256::new();

    loop {
        let next = decoder.read_char()?;
        if let Some((ch, _)) = next {
            text.push(ch);
            chars += 1;
        }
        if text.len() >= BUF_SIZE || (next.is_none() && !text.is_empty()) {
            writer.write_all(text.as_bytes())?;
            #[cfg(feature = "file-io")]
            {
                hasher.update(text.as_bytes());
            }
            text_size += text.len() as u64;
            text.clear();
        }
        if next.is_none() {
            break;
        }
    }
    writer.flush()?;

    log::info!(
        "decoded {chars} values: {} -> {text_size} bytes",
        decoder.bytes_read()
    );

    #[cfg(feature = "file-io")]
    let text_sha256 = Some(hasher.finalize().into());
    #[cfg(not(feature = "file-io"))]
    let text_sha256: Option<[u8; 32]> = None;

    Ok(DecodeStats {
        chars,
        encoded_size: decoder.bytes_read(),
        text_size,
        text_sha256,
    })
}

/// Decode the SCSU file at `input_path` into UTF-8 at `output_path`.
pub fn decode_file(input_path: &Path, output_path: &Path) -> Result<DecodeStats, IoError> {
    let reader = File::open(input_path)?;
    let writer = BufWriter::with_capacity(BUF_SIZE, File::create(output_path)?);
    decode_stream(reader, writer)
}

/// Lowercase hex rendering of a digest.
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
