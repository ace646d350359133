// Strict scalar-value sources for the encoder.
//
// Both sources yield `Result<char, EncodeError>` so they plug directly into
// `Encoder::encode`. Every value before the first malformed sequence is
// yielded; the malformed sequence itself ends the iteration with an error.

use std::char::DecodeUtf16;
use std::iter::Copied;
use std::slice;
use std::str::Chars;

use crate::codec::encoder::EncodeError;

/// Scalar values of a byte slice that must be well-formed UTF-8.
pub struct StrictUtf8<'a> {
    chars: Chars<'a>,
    /// Byte offset of the first malformed sequence, reported once.
    error_at: Option<usize>,
}

impl<'a> StrictUtf8<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        let (valid, error_at) = match std::str::from_utf8(bytes) {
            Ok(text) => (text, None),
            Err(e) => {
                let n = e.valid_up_to();
                (std::str::from_utf8(&bytes[..n]).unwrap_or_default(), Some(n))
            }
        };
        Self {
            chars: valid.chars(),
            error_at,
        }
    }
}

impl Iterator for StrictUtf8<'_> {
    type Item = Result<char, EncodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(ch) = self.chars.next() {
            return Some(Ok(ch));
        }
        self.error_at
            .take()
            .map(|position| Err(EncodeError::InvalidUtf8 { position }))
    }
}

/// Scalar values of UTF-16 code units; unpaired surrogates are errors.
pub struct Utf16Units<'a> {
    inner: DecodeUtf16<Copied<slice::Iter<'a, u16>>>,
    position: usize,
    failed: bool,
}

impl<'a> Utf16Units<'a> {
    pub fn new(units: &'a [u16]) -> Self {
        Self {
            inner: char::decode_utf16(units.iter().copied()),
            position: 0,
            failed: false,
        }
    }
}

impl Iterator for Utf16Units<'_> {
    type Item = Result<char, EncodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.inner.next()? {
            Ok(ch) => {
                self.position += ch.len_utf16();
                Some(Ok(ch))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(EncodeError::UnpairedSurrogate {
                    unit: e.unpaired_surrogate(),
                    position: self.position,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_utf8_yields_prefix_then_error() {
        let items: Vec<_> = StrictUtf8::new(b"a\xC3\xA9\xC3").collect();
        assert_eq!(items.len(), 3);
        assert!(matches!(items[0], Ok('a')));
        assert!(matches!(items[1], Ok('\u{E9}')));
        assert!(matches!(items[2], Err(EncodeError::InvalidUtf8 { position: 3 })));
    }

    #[test]
    fn strict_utf8_rejects_encoded_surrogates() {
        // CESU-style encoding of U+D800.
        let err = StrictUtf8::new(b"\xED\xA0\x80").find_map(Result::err);
        assert!(matches!(err, Some(EncodeError::InvalidUtf8 { position: 0 })));
    }

    #[test]
    fn utf16_pairs_and_positions() {
        let units: Vec<u16> = "x\u{1F600}y".encode_utf16().chain([0xDC00, 0x41]).collect();
        let items: Vec<_> = Utf16Units::new(&units).collect();
        assert_eq!(items.len(), 4);
        assert!(matches!(items[1], Ok('\u{1F600}')));
        assert!(matches!(
            items[3],
            Err(EncodeError::UnpairedSurrogate {
                unit: 0xDC00,
                position: 4
            })
        ));
    }
}
