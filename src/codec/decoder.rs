// SCSU decoder: command interpretation and scalar value reconstruction.
//
// A strictly sequential interpreter. Each call to `next_event` consumes one
// command (plus its operand bytes) or one data unit. Commands that only
// change state surface as non-character events; `read_char` and the
// `Iterator` impl skip them, so a single logical read may consume any number
// of control bytes before yielding a value or reaching end of input.

use std::io::{self, Read};

use thiserror::Error;

use super::tags::{
    SC0, SC7, SCU, SD0, SD7, SDX, SQ0, SQ7, SQU, SRS, STATIC_OFFSETS, UC0, UC7, UD0, UD7, UDX, UQU,
};
use super::window::{InvalidWindowOffset, Mode, WindowState};

// ---------------------------------------------------------------------------
// Decoder error
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DecodeError {
    /// Input ended inside a multi-byte construct.
    #[error("unexpected end of input at byte {position}")]
    UnexpectedEof { position: u64 },
    /// Reserved tag, broken surrogate pairing or an unrepresentable value.
    #[error("illegal input at byte {position}: {reason}")]
    IllegalInput { position: u64, reason: &'static str },
    /// A window definition used a reserved offset index.
    #[error("invalid window offset index {index:#04X} at byte {position}")]
    InvalidWindowOffset { index: u8, position: u64 },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DecodeError {
    /// Whether the error is a protocol violation (as opposed to truncation or I/O).
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::IllegalInput { .. } | Self::InvalidWindowOffset { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// One decoded step of an SCSU stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A scalar value was produced.
    Char(char),
    /// `SCn`/`UCn`: window selected (and single-byte mode entered).
    Select { window: usize },
    /// `SDn`/`SDX`/`UDn`/`UDX`: window (re)defined, selected, and single-byte
    /// mode entered.
    Define { window: usize, offset: u32 },
    /// `SCU`: unicode mode entered.
    EnterUnicode,
}

/// Result of interpreting one command before surrogate bookkeeping.
enum Step {
    Event(Event),
    /// A raw 16-bit unit that may be half of a surrogate pair.
    Unit(u16),
}

const HIGH_SURROGATES: std::ops::RangeInclusive<u16> = 0xD800..=0xDBFF;
const LOW_SURROGATES: std::ops::RangeInclusive<u16> = 0xDC00..=0xDFFF;

fn combine_surrogates(high: u16, low: u16) -> u32 {
    0x10000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(low) - 0xDC00)
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Streaming SCSU decoder over any byte source.
///
/// Bytes are pulled one at a time, so wrap unbuffered readers (files,
/// sockets) in a `BufReader`.
pub struct Decoder<R: Read> {
    reader: R,
    state: WindowState,
    bytes_read: u64,
    /// High surrogate produced by `SQU`/`UQU`, waiting for its low half.
    pending_high: Option<u16>,
    /// Set once the iterator has returned an error or reached the end.
    done: bool,
}

impl<R: Read> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            state: WindowState::new(),
            bytes_read: 0,
            pending_high: None,
            done: false,
        }
    }

    /// Total bytes consumed from the source so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Current window state.
    pub fn state(&self) -> &WindowState {
        &self.state
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Decode the next event. `Ok(None)` is a clean end of input.
    pub fn next_event(&mut self) -> Result<Option<Event>, DecodeError> {
        loop {
            let start = self.bytes_read;
            let Some(byte) = self.read_byte()? else {
                if self.pending_high.is_some() {
                    return Err(DecodeError::UnexpectedEof {
                        position: self.bytes_read,
                    });
                }
                return Ok(None);
            };

            let step = match self.state.mode() {
                Mode::SingleByte => self.single_byte(byte, start)?,
                Mode::Unicode => self.unicode(byte, start)?,
            };

            match step {
                Step::Event(Event::Char(ch)) => {
                    if self.pending_high.is_some() {
                        return Err(illegal(start, "high surrogate not followed by low surrogate"));
                    }
                    return Ok(Some(Event::Char(ch)));
                }
                Step::Event(event) => return Ok(Some(event)),
                Step::Unit(unit) => {
                    if let Some(ch) = self.finish_unit(unit, start)? {
                        return Ok(Some(Event::Char(ch)));
                    }
                }
            }
        }
    }

    /// Read one scalar value and the number of bytes consumed to produce it,
    /// including any control bytes in front of it. Counted like
    /// [`bytes_read`](Self::bytes_read), since a stream may hold any number
    /// of commands between two values.
    pub fn read_char(&mut self) -> Result<Option<(char, u64)>, DecodeError> {
        let before = self.bytes_read;
        while let Some(event) = self.next_event()? {
            if let Event::Char(ch) = event {
                return Ok(Some((ch, self.bytes_read - before)));
            }
        }
        Ok(None)
    }

    /// Decode the rest of the stream, appending to `buf`. Returns the number
    /// of scalar values appended.
    pub fn read_to_string(&mut self, buf: &mut String) -> Result<usize, DecodeError> {
        let mut count = 0;
        while let Some((ch, _)) = self.read_char()? {
            buf.push(ch);
            count += 1;
        }
        Ok(count)
    }

    /// Decode the rest of the stream into a new `String`.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let mut out = String::new();
        self.read_to_string(&mut out)?;
        Ok(out)
    }

    // -- command interpretation ---------------------------------------------

    fn single_byte(&mut self, byte: u8, start: u64) -> Result<Step, DecodeError> {
        let event = match byte {
            SQ0..=SQ7 => {
                let window = usize::from(byte - SQ0);
                let data = self.require_byte()?;
                let cp = if data < 0x80 {
                    STATIC_OFFSETS[window] + u32::from(data)
                } else {
                    self.state.offset(window) + u32::from(data - 0x80)
                };
                Event::Char(scalar(cp, start)?)
            }
            SDX => {
                let descriptor = self.require_u16()?;
                self.state.define_extended_window(descriptor);
                self.defined()
            }
            SD0..=SD7 => {
                let index = self.require_byte()?;
                self.define(usize::from(byte - SD0), index, start)?
            }
            SC0..=SC7 => {
                let window = usize::from(byte - SC0);
                self.state.activate(window);
                log::trace!("SC{window} at byte {start}");
                Event::Select { window }
            }
            SCU => {
                self.state.set_mode(Mode::Unicode);
                log::trace!("SCU at byte {start}");
                Event::EnterUnicode
            }
            SQU => return Ok(Step::Unit(self.require_u16()?)),
            SRS => return Err(illegal(start, "reserved tag Srs")),
            _ if byte < 0x80 => Event::Char(scalar(u32::from(byte), start)?),
            _ => Event::Char(scalar(self.state.active_offset() + u32::from(byte - 0x80), start)?),
        };
        Ok(Step::Event(event))
    }

    fn unicode(&mut self, byte: u8, start: u64) -> Result<Step, DecodeError> {
        let event = match byte {
            UC0..=UC7 => {
                let window = usize::from(byte - UC0);
                self.state.activate(window);
                self.state.set_mode(Mode::SingleByte);
                log::trace!("UC{window} at byte {start}");
                Event::Select { window }
            }
            UD0..=UD7 => {
                let index = self.require_byte()?;
                let event = self.define(usize::from(byte - UD0), index, start)?;
                self.state.set_mode(Mode::SingleByte);
                event
            }
            UDX => {
                let descriptor = self.require_u16()?;
                self.state.define_extended_window(descriptor);
                self.state.set_mode(Mode::SingleByte);
                self.defined()
            }
            UQU => return Ok(Step::Unit(self.require_u16()?)),
            _ => {
                let unit = u16::from_be_bytes([byte, self.require_byte()?]);
                if !HIGH_SURROGATES.contains(&unit) {
                    return Ok(Step::Unit(unit));
                }
                let low = self.require_u16()?;
                if !LOW_SURROGATES.contains(&low) {
                    return Err(illegal(start, "high surrogate not followed by low surrogate"));
                }
                Event::Char(scalar(combine_surrogates(unit, low), start)?)
            }
        };
        Ok(Step::Event(event))
    }

    fn define(&mut self, window: usize, index: u8, start: u64) -> Result<Event, DecodeError> {
        self.state
            .define_window(window, index)
            .map_err(|InvalidWindowOffset(index)| DecodeError::InvalidWindowOffset {
                index,
                position: start,
            })?;
        Ok(self.defined())
    }

    fn defined(&self) -> Event {
        let window = self.state.active();
        let offset = self.state.active_offset();
        log::trace!("window {window} defined at {offset:#06X}");
        Event::Define { window, offset }
    }

    /// Resolve a raw 16-bit unit against any pending high surrogate.
    fn finish_unit(&mut self, unit: u16, start: u64) -> Result<Option<char>, DecodeError> {
        if HIGH_SURROGATES.contains(&unit) {
            if self.pending_high.is_some() {
                return Err(illegal(start, "high surrogate not followed by low surrogate"));
            }
            self.pending_high = Some(unit);
            return Ok(None);
        }
        if LOW_SURROGATES.contains(&unit) {
            let Some(high) = self.pending_high.take() else {
                return Err(illegal(start, "unpaired low surrogate"));
            };
            return scalar(combine_surrogates(high, unit), start).map(Some);
        }
        if self.pending_high.is_some() {
            return Err(illegal(start, "high surrogate not followed by low surrogate"));
        }
        scalar(u32::from(unit), start).map(Some)
    }

    // -- byte source ---------------------------------------------------------

    fn read_byte(&mut self) -> Result<Option<u8>, DecodeError> {
        let mut buf = [0u8; 1];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.bytes_read += 1;
                    return Ok(Some(buf[0]));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn require_byte(&mut self) -> Result<u8, DecodeError> {
        self.read_byte()?.ok_or(DecodeError::UnexpectedEof {
            position: self.bytes_read,
        })
    }

    fn require_u16(&mut self) -> Result<u16, DecodeError> {
        let hi = self.require_byte()?;
        let lo = self.require_byte()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }
}

impl<R: Read> Iterator for Decoder<R> {
    type Item = Result<char, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_char() {
            Ok(Some((ch, _))) => Some(Ok(ch)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn illegal(position: u64, reason: &'static str) -> DecodeError {
    DecodeError::IllegalInput { position, reason }
}

fn scalar(cp: u32, position: u64) -> Result<char, DecodeError> {
    char::from_u32(cp).ok_or_else(|| illegal(position, "value is not a Unicode scalar value"))
}

// ---------------------------------------------------------------------------
// High-level convenience: decode in memory
// ---------------------------------------------------------------------------

/// Decode a complete SCSU byte buffer. End of input is success.
pub fn decode(bytes: &[u8]) -> Result<String, DecodeError> {
    let mut out = String::with_capacity(bytes.len());
    Decoder::new(bytes).read_to_string(&mut out)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SC3: u8 = SC0 + 3;
    const UC2: u8 = UC0 + 2;

    fn unexpected_eof(bytes: &[u8]) -> bool {
        matches!(decode(bytes), Err(DecodeError::UnexpectedEof { .. }))
    }

    fn illegal_input(bytes: &[u8]) -> bool {
        matches!(decode(bytes), Err(DecodeError::IllegalInput { .. }))
    }

    #[test]
    fn empty_input_is_empty_string() {
        assert_eq!(decode(&[]).unwrap(), "");
    }

    #[test]
    fn control_only_streams_end_cleanly() {
        assert_eq!(decode(&[SC3]).unwrap(), "");
        assert_eq!(decode(&[SCU]).unwrap(), "");
        assert_eq!(decode(&[SCU, UC2, SD0 + 1, 0x08]).unwrap(), "");
    }

    #[test]
    fn ascii_and_default_window() {
        assert_eq!(decode(b"Hi\r\n\t").unwrap(), "Hi\r\n\t");
        assert_eq!(decode(&[0x00]).unwrap(), "\0");
        // Window 0 starts at 0x80.
        assert_eq!(decode(&[0xE9]).unwrap(), "\u{E9}");
    }

    #[test]
    fn quote_does_not_change_active_window() {
        // SQ1 + low byte quotes static window 1 (0x80), SQ2 + high byte
        // quotes dynamic window 2 (0x400), then 0x81 goes through window 0.
        let decoded = decode(&[SQ0 + 1, 0x05, SQ0 + 2, 0x81, 0x81]).unwrap();
        assert_eq!(decoded, "\u{85}\u{401}\u{81}");
        // SQ0 quotes tag-valued bytes as ASCII controls.
        assert_eq!(decode(&[SQ0, 0x01, SQ0, 0x0C]).unwrap(), "\u{1}\u{C}");
    }

    #[test]
    fn define_window_variants() {
        // Half-block, gap-shifted and fixed offsets.
        assert_eq!(decode(&[SD0, 0x0A, 0x80]).unwrap(), "\u{500}");
        assert_eq!(decode(&[SD0 + 1, 0x69, 0x81]).unwrap(), "\u{E081}");
        assert_eq!(decode(&[SD0 + 2, 0xFB, 0x80]).unwrap(), "\u{370}");
    }

    #[test]
    fn define_window_rejects_reserved_offsets() {
        for index in [0x00u8, 0xA8, 0xC0, 0xF8] {
            let err = decode(&[SD0, index, 0x80]).unwrap_err();
            assert!(
                matches!(err, DecodeError::InvalidWindowOffset { index: i, position: 0 } if i == index),
                "{err}"
            );
            assert!(err.is_malformed());
            let err = decode(&[SCU, UD0 + 4, index]).unwrap_err();
            assert!(matches!(err, DecodeError::InvalidWindowOffset { position: 1, .. }));
        }
    }

    #[test]
    fn extended_window_reaches_supplementary_planes() {
        // Window 1 at 0x10300 (Old Italic).
        assert_eq!(decode(&[SDX, 0x20, 0x06, 0x80, 0x81]).unwrap(), "\u{10300}\u{10301}");
        assert_eq!(decode(&[SCU, UDX, 0x20, 0x06, 0x80]).unwrap(), "\u{10300}");
    }

    #[test]
    fn quoted_units() {
        assert_eq!(decode(&[SQU, 0x4E, 0x00, b'a']).unwrap(), "\u{4E00}a");
        assert_eq!(decode(&[SCU, UQU, 0xE0, 0x00, 0x4E, 0x00]).unwrap(), "\u{E000}\u{4E00}");
        // A quoted surrogate pair.
        assert_eq!(decode(&[SQU, 0xD8, 0x3D, SQU, 0xDE, 0x00]).unwrap(), "\u{1F600}");
    }

    #[test]
    fn unicode_mode_units_and_switch_back() {
        let decoded = decode(&[SCU, 0x04, 0x1F, UC0 + 2, 0x81]).unwrap();
        assert_eq!(decoded, "\u{41F}\u{401}");
        assert_eq!(decode(&[SCU, UD0, 0x0A, 0x85]).unwrap(), "\u{505}");
        // Urs is the high byte of an ordinary unit.
        assert_eq!(decode(&[SCU, 0xF2, 0x34]).unwrap(), "\u{F234}");
    }

    #[test]
    fn surrogate_pairing() {
        assert_eq!(decode(&[SCU, 0xD8, 0x00, 0xDC, 0x00]).unwrap(), "\u{10000}");
        assert_eq!(decode(&[SCU, 0xDB, 0xFF, 0xDF, 0xFF]).unwrap(), "\u{10FFFF}");
        assert!(illegal_input(&[SCU, 0xD8, 0x00, 0x00, 0x41]));
        assert!(illegal_input(&[SCU, 0xDC, 0x00]));
        assert!(illegal_input(&[SQU, 0xDC, 0x00]));
        assert!(illegal_input(&[SQU, 0xD8, 0x00, b'a']));
        assert!(unexpected_eof(&[SQU, 0xD8, 0x00]));
    }

    #[test]
    fn reserved_tag_is_illegal_anywhere() {
        assert!(illegal_input(&[SRS]));
        assert!(illegal_input(&[b'a', b'b', SRS, b'c']));
        assert!(illegal_input(&[SCU, UC0 + 5, SRS]));
        let err = decode(&[b'x', SRS]).unwrap_err();
        assert!(matches!(err, DecodeError::IllegalInput { position: 1, .. }));
    }

    #[test]
    fn truncated_commands() {
        let truncated: &[&[u8]] = &[
            &[SQ0],
            &[SQ0 + 7],
            &[SD0],
            &[SDX],
            &[SDX, 0x20],
            &[SQU],
            &[SQU, 0x4E],
            &[SCU, 0x4E],
            &[SCU, 0xD8, 0x00],
            &[SCU, 0xD8, 0x00, 0xDC],
            &[SCU, UD0],
            &[SCU, UDX, 0x20],
            &[SCU, UQU],
            &[SCU, UQU, 0xE0],
        ];
        for bytes in truncated {
            assert!(unexpected_eof(bytes), "{bytes:02X?}");
        }
    }

    #[test]
    fn read_char_reports_consumed_bytes() {
        let bytes = [SC0 + 2, 0x9C, SQU, 0x4E, 0x00, b'a'];
        let mut dec = Decoder::new(&bytes[..]);
        assert_eq!(dec.read_char().unwrap(), Some(('\u{41C}', 2)));
        assert_eq!(dec.read_char().unwrap(), Some(('\u{4E00}', 3)));
        assert_eq!(dec.read_char().unwrap(), Some(('a', 1)));
        assert_eq!(dec.read_char().unwrap(), None);
        assert_eq!(dec.bytes_read(), bytes.len() as u64);
    }

    #[test]
    fn read_char_counts_long_command_runs() {
        let mut bytes = vec![SC0; 70_000];
        bytes.push(b'a');
        let mut dec = Decoder::new(&bytes[..]);
        assert_eq!(dec.read_char().unwrap(), Some(('a', 70_001)));
        assert_eq!(dec.bytes_read(), 70_001);
    }

    #[test]
    fn events_expose_state_changes() {
        let bytes = [SD0 + 3, 0x08, SCU, 0x4E, 0x00, UC0 + 1, 0xE9];
        let events: Vec<Event> = {
            let mut dec = Decoder::new(&bytes[..]);
            std::iter::from_fn(|| dec.next_event().unwrap()).collect()
        };
        assert_eq!(
            events,
            vec![
                Event::Define {
                    window: 3,
                    offset: 0x400
                },
                Event::EnterUnicode,
                Event::Char('\u{4E00}'),
                Event::Select { window: 1 },
                Event::Char('\u{129}'),
            ]
        );
    }

    #[test]
    fn iterator_fuses_after_error() {
        let bytes = [b'a', SRS, b'b'];
        let mut dec = Decoder::new(&bytes[..]);
        assert!(matches!(dec.next(), Some(Ok('a'))));
        assert!(matches!(dec.next(), Some(Err(_))));
        assert!(dec.next().is_none());
    }
}
