// Window state shared in shape (never in instance) by encoder and decoder.
//
// Eight dynamic windows, the index of the active one, and the current mode.
// The only mutation paths are window definition (which always activates the
// defined window), plain activation, and mode changes.

use thiserror::Error;

use super::tags::{
    EXTENDED_BASE, FIXED_OFFSETS, FIXED_THRESHOLD, GAP_OFFSET, GAP_THRESHOLD,
    INITIAL_DYNAMIC_OFFSETS, RESERVED_START, STATIC_OFFSETS, WINDOW_COUNT, WINDOW_LEN,
};

/// A window definition named a reserved offset index (0x00 or
/// `RESERVED_START..FIXED_THRESHOLD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid window offset index {0:#04X}")]
pub struct InvalidWindowOffset(pub u8);

/// Interpretation mode for subsequent bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    SingleByte,
    Unicode,
}

/// Per-stream window state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowState {
    offsets: [u32; WINDOW_COUNT],
    active: usize,
    mode: Mode,
}

impl Default for WindowState {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowState {
    /// Fresh state: initial offsets, window 0 active, single-byte mode.
    pub fn new() -> Self {
        Self {
            offsets: INITIAL_DYNAMIC_OFFSETS,
            active: 0,
            mode: Mode::SingleByte,
        }
    }

    /// (Re-)define dynamic window `window` from an offset index byte and make
    /// it the active window. On error the state is left untouched.
    ///
    /// Panics if `window >= 8`.
    pub fn define_window(&mut self, window: usize, index: u8) -> Result<(), InvalidWindowOffset> {
        let offset = window_offset(index)?;
        self.offsets[window] = offset;
        self.active = window;
        Ok(())
    }

    /// (Re-)define a window in the supplementary planes from a 16-bit
    /// descriptor and make it active. The top three bits select the window.
    pub fn define_extended_window(&mut self, descriptor: u16) {
        let (window, offset) = extended_offset(descriptor);
        self.offsets[window] = offset;
        self.active = window;
    }

    /// Select `window` without redefining it.
    ///
    /// Panics if `window >= 8`.
    pub fn activate(&mut self, window: usize) {
        assert!(window < WINDOW_COUNT, "window index {window} out of range");
        self.active = window;
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Index of the active dynamic window.
    pub fn active(&self) -> usize {
        self.active
    }

    /// Base offset of dynamic window `window`.
    pub fn offset(&self, window: usize) -> u32 {
        self.offsets[window]
    }

    pub fn active_offset(&self) -> u32 {
        self.offsets[self.active]
    }

    pub fn offsets(&self) -> &[u32; WINDOW_COUNT] {
        &self.offsets
    }

    /// Find a dynamic window containing `cp`, preferring the active one.
    pub fn find_dynamic(&self, cp: u32) -> Option<usize> {
        if in_window(self.offsets[self.active], cp) {
            return Some(self.active);
        }
        (0..WINDOW_COUNT).find(|&w| in_window(self.offsets[w], cp))
    }
}

// ---------------------------------------------------------------------------
// Offset derivation
// ---------------------------------------------------------------------------

/// Base offset selected by a window index byte.
///
/// Most scripts start on a half-block boundary, so the index is normally
/// multiplied by 0x80. Indices at or above `GAP_THRESHOLD` skip the
/// 0x3400..0xDFFF region (Han, Hangul, surrogates), which has too little
/// locality to be worth a window. The top indices pick fixed offsets.
pub fn window_offset(index: u8) -> Result<u32, InvalidWindowOffset> {
    match index {
        0 => Err(InvalidWindowOffset(index)),
        i if i < GAP_THRESHOLD => Ok(u32::from(i) << 7),
        i if i < RESERVED_START => Ok((u32::from(i) << 7) + GAP_OFFSET),
        i if i < FIXED_THRESHOLD => Err(InvalidWindowOffset(i)),
        i => Ok(FIXED_OFFSETS[(i - FIXED_THRESHOLD) as usize]),
    }
}

/// Window index and base offset encoded by an extended window descriptor.
///
/// ```text
///  hbyte     lbyte     data          high surrogate    low surrogate
/// nnnwwwww  zzzzzyyy  1xxxxxxx  ->  110110wwwwwzzzzz  110111yyyxxxxxxx
/// ```
pub fn extended_offset(descriptor: u16) -> (usize, u32) {
    let window = usize::from(descriptor >> 13);
    let offset = ((u32::from(descriptor) & 0x1FFF) << 7) + EXTENDED_BASE;
    (window, offset)
}

/// Descriptor that defines `window` as the extended window containing `cp`.
///
/// `cp` must be a supplementary-plane value.
pub fn extended_descriptor(window: usize, cp: u32) -> u16 {
    debug_assert!(cp >= EXTENDED_BASE);
    (((window as u32) << 13) | ((cp - EXTENDED_BASE) >> 7)) as u16
}

/// Whether `cp` lies in the 128-value window starting at `offset`.
#[inline]
pub fn in_window(offset: u32, cp: u32) -> bool {
    cp >= offset && cp - offset < WINDOW_LEN
}

/// Static window containing `cp`, if any.
pub fn find_static(cp: u32) -> Option<usize> {
    STATIC_OFFSETS.iter().position(|&s| in_window(s, cp))
}

/// Whether a BMP value can be covered by a dynamic window at all.
pub fn is_windowable(cp: u32) -> bool {
    cp >= EXTENDED_BASE || (cp >= 0x80 && (cp < 0x3400 || cp >= 0xE000))
}

/// Candidate offset index bytes for a window covering the BMP value `cp`:
/// a fixed offset (if `cp` falls inside one) followed by the half-block
/// index (if `cp` is outside the gap). Both may be absent.
pub fn index_candidates(cp: u32) -> [Option<u8>; 2] {
    let fixed = FIXED_OFFSETS
        .iter()
        .position(|&f| in_window(f, cp))
        .map(|i| FIXED_THRESHOLD + i as u8);
    let half_block = match cp {
        0x80..0x3400 => Some((cp >> 7) as u8),
        0xE000..0x10000 => Some(((cp - GAP_OFFSET) >> 7) as u8),
        _ => None,
    };
    [fixed, half_block]
}
