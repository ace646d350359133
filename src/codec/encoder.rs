// SCSU encoder: window selection and mode switching.
//
// The encoder mirrors the decoder's window state and, for every scalar
// value, picks the cheapest representation it can see with a few values of
// lookahead:
//
//   1. ASCII or the active window: one byte.
//   2. Another defined window: `SCn` when the following values stay in it,
//      otherwise a one-off `SQn` quote.
//   3. A new window: `SDn`/`SDX` when enough upcoming values share it
//      (always for supplementary values, which have no cheaper path).
//   4. A static window: `SQn` quote.
//   5. No locality: unicode mode for runs, `SQU` for isolated values.
//
// In unicode mode the encoder leaves as soon as the upcoming values have
// single-byte locality again. Whatever the heuristics decide, every emitted
// byte sequence decodes to exactly the input.

use std::collections::VecDeque;
use std::io::{self, Write};

use thiserror::Error;

use super::tags::{
    EXTENDED_BASE, SC0, SCU, SD0, SDX, SQ0, SQU, STATIC_OFFSETS, UC0, UD0, UDX, UQU,
    WINDOW_COUNT, is_single_byte_data, is_unicode_tag,
};
use super::window::{
    InvalidWindowOffset, Mode, WindowState, extended_descriptor, extended_offset, find_static,
    in_window, index_candidates, is_windowable, window_offset,
};
use crate::source::StrictUtf8;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Tuning for the encoder's window heuristics. None of these affect
/// decodability, only output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Values (current plus upcoming, ASCII in between ignored) that must
    /// fall into a new window before it is defined rather than quoted.
    pub define_threshold: usize,
    /// Consecutive values without window locality needed to switch to
    /// unicode mode rather than quote each one with `SQU`.
    pub unicode_threshold: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            define_threshold: 2,
            unicode_threshold: 2,
        }
    }
}

impl EncodeOptions {
    /// Number of upcoming values the encoder needs to see before committing
    /// to a representation of the current one.
    pub fn lookahead(&self) -> usize {
        self.define_threshold
            .max(self.unicode_threshold)
            .saturating_sub(1)
            .max(1)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("invalid UTF-8 at byte {position}")]
    InvalidUtf8 { position: usize },
    #[error("unpaired surrogate {unit:#06X} at index {position}")]
    UnpairedSurrogate { unit: u16, position: usize },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EncodeError {
    /// Whether the source text itself was malformed.
    pub fn is_invalid_utf(&self) -> bool {
        matches!(self, Self::InvalidUtf8 { .. } | Self::UnpairedSurrogate { .. })
    }
}

// ---------------------------------------------------------------------------
// Planner: per-value representation choice
// ---------------------------------------------------------------------------

/// How a new window would be defined.
#[derive(Debug, Clone, Copy)]
enum Definition {
    Index(u8),
    Extended,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    definition: Definition,
    offset: u32,
    run: usize,
}

struct Planner {
    state: WindowState,
    opts: EncodeOptions,
    /// Logical clock value of each window's last use, for LRU eviction.
    last_used: [u64; WINDOW_COUNT],
    clock: u64,
}

impl Planner {
    fn new(opts: EncodeOptions) -> Self {
        Self {
            state: WindowState::new(),
            opts,
            last_used: [0; WINDOW_COUNT],
            clock: 0,
        }
    }

    fn encode(&mut self, ch: char, ahead: &[char], out: &mut Vec<u8>) {
        let cp = u32::from(ch);
        match self.state.mode() {
            Mode::SingleByte => self.single_byte(cp, ahead, out),
            Mode::Unicode => self.unicode(cp, ahead, out),
        }
    }

    fn single_byte(&mut self, cp: u32, ahead: &[char], out: &mut Vec<u8>) {
        if cp < 0x80 {
            let byte = cp as u8;
            if !is_single_byte_data(byte) {
                out.push(SQ0);
            }
            out.push(byte);
            return;
        }

        if let Some(window) = self.state.find_dynamic(cp) {
            let offset = self.state.offset(window);
            if window != self.state.active() {
                if run_in(offset, ahead) == 0 {
                    out.extend([SQ0 + window as u8, data_byte(offset, cp)]);
                    self.touch(window);
                    return;
                }
                out.push(SC0 + window as u8);
                self.state.activate(window);
            }
            out.push(data_byte(offset, cp));
            self.touch(window);
            return;
        }

        if let Some(candidate) = self.candidate(cp, ahead)
            && (cp >= EXTENDED_BASE || candidate.run >= self.opts.define_threshold)
            && self.define(candidate, cp, Mode::SingleByte, out).is_ok()
        {
            out.push(data_byte(candidate.offset, cp));
            return;
        }

        if let Some(window) = find_static(cp) {
            out.extend([SQ0 + window as u8, (cp - STATIC_OFFSETS[window]) as u8]);
            return;
        }

        if self.unicode_run(ahead) >= self.opts.unicode_threshold {
            log::debug!("switching to unicode mode at {cp:#06X}");
            out.push(SCU);
            self.state.set_mode(Mode::Unicode);
            push_unicode_unit(cp, out);
            return;
        }

        // Every supplementary value was handled by an extended window above.
        debug_assert!(cp < EXTENDED_BASE);
        out.push(SQU);
        out.extend((cp as u16).to_be_bytes());
    }

    fn unicode(&mut self, cp: u32, ahead: &[char], out: &mut Vec<u8>) {
        if self.has_locality(cp) && ahead.first().is_none_or(|&c| self.has_locality(u32::from(c))) {
            let window = if cp < 0x80 {
                self.state.active()
            } else {
                self.state.find_dynamic(cp).unwrap_or(self.state.active())
            };
            log::debug!("switching to single-byte mode, window {window}");
            out.push(UC0 + window as u8);
            self.state.activate(window);
            self.state.set_mode(Mode::SingleByte);
            self.single_byte(cp, ahead, out);
            return;
        }

        if let Some(candidate) = self.candidate(cp, ahead)
            && candidate.run >= self.opts.define_threshold
            && self.define(candidate, cp, Mode::Unicode, out).is_ok()
        {
            self.state.set_mode(Mode::SingleByte);
            out.push(data_byte(candidate.offset, cp));
            return;
        }

        push_unicode_unit(cp, out);
    }

    /// Emit the definition command for a new window holding `cp` and mirror
    /// it in the window state. Nothing is emitted on error.
    fn define(
        &mut self,
        candidate: Candidate,
        cp: u32,
        mode: Mode,
        out: &mut Vec<u8>,
    ) -> Result<(), InvalidWindowOffset> {
        let window = self.victim();
        match candidate.definition {
            Definition::Index(index) => {
                self.state.define_window(window, index)?;
                let tag = if mode == Mode::SingleByte { SD0 } else { UD0 };
                out.extend([tag + window as u8, index]);
            }
            Definition::Extended => {
                let descriptor = extended_descriptor(window, cp);
                self.state.define_extended_window(descriptor);
                let tag = if mode == Mode::SingleByte { SDX } else { UDX };
                out.push(tag);
                out.extend(descriptor.to_be_bytes());
            }
        }
        log::debug!("defined window {window} at {:#06X}", candidate.offset);
        self.touch(window);
        Ok(())
    }

    /// Best new window for `cp`, judged by how many upcoming values it covers.
    fn candidate(&self, cp: u32, ahead: &[char]) -> Option<Candidate> {
        if !is_windowable(cp) {
            return None;
        }
        if cp >= EXTENDED_BASE {
            let (_, offset) = extended_offset(extended_descriptor(0, cp));
            return Some(Candidate {
                definition: Definition::Extended,
                offset,
                run: 1 + run_in(offset, ahead),
            });
        }
        let mut best: Option<Candidate> = None;
        for index in index_candidates(cp).into_iter().flatten() {
            let Ok(offset) = window_offset(index) else {
                continue;
            };
            let run = 1 + run_in(offset, ahead);
            if best.is_none_or(|b| run > b.run) {
                best = Some(Candidate {
                    definition: Definition::Index(index),
                    offset,
                    run,
                });
            }
        }
        best
    }

    /// Whether `cp` can be written as a single byte without redefining.
    fn has_locality(&self, cp: u32) -> bool {
        cp < 0x80 || self.state.find_dynamic(cp).is_some()
    }

    /// Length of the run of values without single-byte locality, given that
    /// the current one has none.
    fn unicode_run(&self, ahead: &[char]) -> usize {
        1 + ahead
            .iter()
            .take_while(|&&c| !self.has_locality(u32::from(c)))
            .count()
    }

    fn touch(&mut self, window: usize) {
        self.clock += 1;
        self.last_used[window] = self.clock;
    }

    /// Least recently used window; ties go to the highest index so the
    /// default Latin-1 windows are kept longest.
    fn victim(&self) -> usize {
        (0..WINDOW_COUNT)
            .rev()
            .min_by_key(|&w| self.last_used[w])
            .unwrap_or(WINDOW_COUNT - 1)
    }
}

/// Upcoming non-ASCII values in the window at `offset` before the first one
/// outside it.
fn run_in(offset: u32, ahead: &[char]) -> usize {
    ahead
        .iter()
        .map(|&c| u32::from(c))
        .filter(|&c| c >= 0x80)
        .take_while(|&c| in_window(offset, c))
        .count()
}

#[inline]
fn data_byte(offset: u32, cp: u32) -> u8 {
    debug_assert!(in_window(offset, cp));
    0x80 + (cp - offset) as u8
}

fn push_unicode_unit(cp: u32, out: &mut Vec<u8>) {
    if cp >= EXTENDED_BASE {
        let v = cp - EXTENDED_BASE;
        out.extend((0xD800 + (v >> 10) as u16).to_be_bytes());
        out.extend((0xDC00 + (v & 0x3FF) as u16).to_be_bytes());
        return;
    }
    let unit = (cp as u16).to_be_bytes();
    if is_unicode_tag(unit[0]) {
        out.push(UQU);
    }
    out.extend(unit);
}

// ---------------------------------------------------------------------------
// Streaming encoder
// ---------------------------------------------------------------------------

/// Output is handed to the writer in chunks of about this size.
const FLUSH_THRESHOLD: usize = 8 * 1024;

/// Streaming SCSU encoder over any byte sink.
///
/// Values are held back until enough lookahead is available, so output
/// lags input by a few values; call [`Encoder::flush`] or
/// [`Encoder::finish`] to force everything out. Dropping the encoder without
/// either discards the held-back values.
///
/// # Example
/// ```
/// use scsu::codec::encoder::Encoder;
/// let mut enc = Encoder::new(Vec::new());
/// enc.write_str("Москва").unwrap();
/// let bytes = enc.finish().unwrap();
/// assert_eq!(bytes, [0x12, 0x9C, 0xBE, 0xC1, 0xBA, 0xB2, 0xB0]);
/// ```
pub struct Encoder<W: Write> {
    writer: W,
    planner: Planner,
    pending: VecDeque<char>,
    lookahead: usize,
    buf: Vec<u8>,
    chars_written: u64,
    bytes_flushed: u64,
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, EncodeOptions::default())
    }

    pub fn with_options(writer: W, opts: EncodeOptions) -> Self {
        let lookahead = opts.lookahead();
        Self {
            writer,
            planner: Planner::new(opts),
            pending: VecDeque::with_capacity(lookahead + 1),
            lookahead,
            buf: Vec::with_capacity(FLUSH_THRESHOLD),
            chars_written: 0,
            bytes_flushed: 0,
        }
    }

    /// Encode one scalar value.
    pub fn write_char(&mut self, ch: char) -> Result<(), EncodeError> {
        self.pending.push_back(ch);
        self.chars_written += 1;
        while self.pending.len() > self.lookahead {
            self.encode_front();
        }
        if self.buf.len() >= FLUSH_THRESHOLD {
            self.write_buf()?;
        }
        Ok(())
    }

    pub fn write_str(&mut self, text: &str) -> Result<(), EncodeError> {
        text.chars().try_for_each(|ch| self.write_char(ch))
    }

    pub fn write_chars<I: IntoIterator<Item = char>>(&mut self, chars: I) -> Result<(), EncodeError> {
        chars.into_iter().try_for_each(|ch| self.write_char(ch))
    }

    /// Encode every value from a fallible source such as
    /// [`StrictUtf8`](crate::source::StrictUtf8). Stops at the first source
    /// error; values before it stay encoded. Returns the number of values
    /// consumed.
    pub fn encode<I>(&mut self, source: I) -> Result<u64, EncodeError>
    where
        I: IntoIterator<Item = Result<char, EncodeError>>,
    {
        let mut count = 0;
        for item in source {
            self.write_char(item?)?;
            count += 1;
        }
        Ok(count)
    }

    /// Encode all held-back values and flush the writer. Encoding may then
    /// continue; the held-back values were encoded with less lookahead.
    pub fn flush(&mut self) -> Result<(), EncodeError> {
        while !self.pending.is_empty() {
            self.encode_front();
        }
        self.write_buf()?;
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W, EncodeError> {
        self.flush()?;
        Ok(self.writer)
    }

    /// Scalar values accepted so far.
    pub fn chars_written(&self) -> u64 {
        self.chars_written
    }

    /// Bytes produced so far, including ones not yet handed to the writer.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_flushed + self.buf.len() as u64
    }

    /// Window state after the last encoded value.
    pub fn state(&self) -> &WindowState {
        &self.planner.state
    }

    fn encode_front(&mut self) {
        let Some(ch) = self.pending.pop_front() else {
            return;
        };
        let ahead = self.pending.make_contiguous();
        self.planner.encode(ch, ahead, &mut self.buf);
    }

    fn write_buf(&mut self) -> Result<(), EncodeError> {
        if !self.buf.is_empty() {
            self.writer.write_all(&self.buf)?;
            self.bytes_flushed += self.buf.len() as u64;
            self.buf.clear();
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Convenience functions
// ---------------------------------------------------------------------------

/// Encode a string, appending to `out`.
pub fn encode_str_into(text: &str, out: &mut Vec<u8>) {
    let opts = EncodeOptions::default();
    let lookahead = opts.lookahead();
    let chars: Vec<char> = text.chars().collect();
    let mut planner = Planner::new(opts);
    for (i, &ch) in chars.iter().enumerate() {
        let end = (i + 1 + lookahead).min(chars.len());
        planner.encode(ch, &chars[i + 1..end], out);
    }
}

/// Encode a string into a new buffer.
pub fn encode_str(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    encode_str_into(text, &mut out);
    out
}

/// Encode a fallible scalar-value source, appending to `out`. Returns the
/// number of values encoded.
///
/// On a source error `out` keeps its previous contents followed by the
/// encoding of every value before the malformed one.
pub fn encode_into<I>(source: I, out: &mut Vec<u8>) -> Result<u64, EncodeError>
where
    I: IntoIterator<Item = Result<char, EncodeError>>,
{
    let mut enc = Encoder::new(out);
    let encoded = enc.encode(source);
    enc.finish()?;
    encoded
}

/// Encode a fallible scalar-value source, appending to `buf` when given.
/// Use [`encode_into`] to keep the buffer when the source is malformed.
pub fn encode_all<I>(source: I, buf: Option<Vec<u8>>) -> Result<Vec<u8>, EncodeError>
where
    I: IntoIterator<Item = Result<char, EncodeError>>,
{
    let mut out = buf.unwrap_or_default();
    encode_into(source, &mut out)?;
    Ok(out)
}

/// Encode bytes that must be well-formed UTF-8.
pub fn encode_utf8(bytes: &[u8]) -> Result<Vec<u8>, EncodeError> {
    encode_all(StrictUtf8::new(bytes), Some(Vec::with_capacity(bytes.len())))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
