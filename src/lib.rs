//! SCSU: the Standard Compression Scheme for Unicode (UTS #6) in Rust.
//!
//! The crate provides:
//! - The SCSU state machines: window state, decoder and encoder (`codec`)
//! - Strict scalar-value sources for UTF-8 and UTF-16 input (`source`)
//! - Stream- and file-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use scsu::codec::{decode, encode_str};
//!
//! let text = "Привет, мир!";
//! let encoded = encode_str(text);
//! assert!(encoded.len() < text.len());
//! assert_eq!(decode(&encoded).unwrap(), text);
//! ```

pub mod codec;
pub mod io;
pub mod source;

#[cfg(feature = "cli")]
pub mod cli;

pub use codec::{
    DecodeError, Decoder, EncodeError, EncodeOptions, Encoder, decode, encode_all, encode_str,
    encode_utf8,
};
