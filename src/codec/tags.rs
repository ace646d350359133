// SCSU command bytes and offset tables (UTS #6, Sections 5 and 8).
//
// Tag values are fixed by the standard. Single-byte mode and unicode mode
// use disjoint alphabets: in single-byte mode the tags live in 0x01..0x1F
// (minus the control characters that pass through as data), in unicode mode
// they occupy 0xE0..0xF2 as the high byte of what would otherwise be a
// 16-bit code unit.

// ---------------------------------------------------------------------------
// Single-byte mode tags
// ---------------------------------------------------------------------------

/// Quote from window pair 0..7 (`SQ0` is 0x01, `SQ7` is 0x08).
pub const SQ0: u8 = 0x01;
pub const SQ7: u8 = 0x08;
/// Define an extended window.
pub const SDX: u8 = 0x0B;
/// Reserved.
pub const SRS: u8 = 0x0C;
/// Quote one 16-bit unit.
pub const SQU: u8 = 0x0E;
/// Change to unicode mode.
pub const SCU: u8 = 0x0F;
/// Change to window 0..7.
pub const SC0: u8 = 0x10;
pub const SC7: u8 = 0x17;
/// Define window 0..7.
pub const SD0: u8 = 0x18;
pub const SD7: u8 = 0x1F;

// ---------------------------------------------------------------------------
// Unicode mode tags
// ---------------------------------------------------------------------------

/// Change to single-byte mode, window 0..7.
pub const UC0: u8 = 0xE0;
pub const UC7: u8 = 0xE7;
/// Define window 0..7 and change to single-byte mode.
pub const UD0: u8 = 0xE8;
pub const UD7: u8 = 0xEF;
/// Quote one 16-bit unit.
pub const UQU: u8 = 0xF0;
/// Define an extended window and change to single-byte mode.
pub const UDX: u8 = 0xF1;
/// Reserved.
pub const URS: u8 = 0xF2;

// ---------------------------------------------------------------------------
// Offset tables
// ---------------------------------------------------------------------------

/// Number of dynamic (and static) windows.
pub const WINDOW_COUNT: usize = 8;

/// Length of every window in code points.
pub const WINDOW_LEN: u32 = 0x80;

/// Fixed offsets of the static windows, used only by `SQn` with a data byte
/// below 0x80.
pub const STATIC_OFFSETS: [u32; WINDOW_COUNT] = [
    0x0000, // ASCII, for quoting tags
    0x0080, // Latin-1 Supplement
    0x0100, // Latin Extended-A
    0x0300, // Combining Diacritical Marks
    0x2000, // General Punctuation
    0x2080, // Currency Symbols
    0x2100, // Letterlike Symbols and Number Forms
    0x3000, // CJK Symbols and Punctuation
];

/// Dynamic window offsets at the start of every stream.
pub const INITIAL_DYNAMIC_OFFSETS: [u32; WINDOW_COUNT] = [
    0x0080, // Latin-1 Supplement
    0x00C0, // Latin-1 letters and half of Latin Extended-A
    0x0400, // Cyrillic
    0x0600, // Arabic
    0x0900, // Devanagari
    0x3040, // Hiragana
    0x30A0, // Katakana
    0xFF00, // Fullwidth ASCII
];

/// Offsets selected by window index bytes `FIXED_THRESHOLD..=0xFF`, for
/// scripts that straddle half-block boundaries.
pub const FIXED_OFFSETS: [u32; 7] = [
    0x00C0, // Latin-1 letters
    0x0250, // IPA Extensions
    0x0370, // Greek
    0x0530, // Armenian
    0x3040, // Hiragana
    0x30A0, // Katakana
    0xFF60, // Halfwidth Katakana
];

/// Index bytes below this map to `index << 7`.
pub const GAP_THRESHOLD: u8 = 0x68;
/// Added to `index << 7` for indices in `GAP_THRESHOLD..RESERVED_START`,
/// skipping 0x3400..0xDFFF.
pub const GAP_OFFSET: u32 = 0xAC00;
/// Index bytes in `RESERVED_START..FIXED_THRESHOLD` are reserved.
pub const RESERVED_START: u8 = 0xA8;
/// First index byte that selects from `FIXED_OFFSETS`.
pub const FIXED_THRESHOLD: u8 = 0xF9;

/// Base of the supplementary planes addressed by extended windows.
pub const EXTENDED_BASE: u32 = 0x10000;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Whether `byte` is passed through as data in single-byte mode.
///
/// NUL, TAB, LF, CR and 0x20..=0xFF are data; every other byte below 0x20
/// is a tag.
#[inline]
pub fn is_single_byte_data(byte: u8) -> bool {
    matches!(byte, 0x00 | 0x09 | 0x0A | 0x0D | 0x20..=0xFF)
}

/// Whether `byte`, as the first byte of a unit in unicode mode, would be read
/// as a tag. `URS` is included so that the encoder always quotes units in
/// 0xF200..=0xF2FF, regardless of how a decoder treats the reserved tag.
#[inline]
pub fn is_unicode_tag(byte: u8) -> bool {
    (UC0..=URS).contains(&byte)
}

/// Human-readable name of a single-byte mode command, for diagnostics.
pub fn single_byte_tag_name(byte: u8) -> Option<&'static str> {
    const SQ: [&str; 8] = ["SQ0", "SQ1", "SQ2", "SQ3", "SQ4", "SQ5", "SQ6", "SQ7"];
    const SC: [&str; 8] = ["SC0", "SC1", "SC2", "SC3", "SC4", "SC5", "SC6", "SC7"];
    const SD: [&str; 8] = ["SD0", "SD1", "SD2", "SD3", "SD4", "SD5", "SD6", "SD7"];
    match byte {
        SQ0..=SQ7 => Some(SQ[(byte - SQ0) as usize]),
        SDX => Some("SDX"),
        SRS => Some("Srs"),
        SQU => Some("SQU"),
        SCU => Some("SCU"),
        SC0..=SC7 => Some(SC[(byte - SC0) as usize]),
        SD0..=SD7 => Some(SD[(byte - SD0) as usize]),
        _ => None,
    }
}

/// Human-readable name of a unicode mode command, for diagnostics.
pub fn unicode_tag_name(byte: u8) -> Option<&'static str> {
    const UC: [&str; 8] = ["UC0", "UC1", "UC2", "UC3", "UC4", "UC5", "UC6", "UC7"];
    const UD: [&str; 8] = ["UD0", "UD1", "UD2", "UD3", "UD4", "UD5", "UD6", "UD7"];
    match byte {
        UC0..=UC7 => Some(UC[(byte - UC0) as usize]),
        UD0..=UD7 => Some(UD[(byte - UD0) as usize]),
        UQU => Some("UQU"),
        UDX => Some("UDX"),
        URS => Some("Urs"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_byte_data_excludes_every_tag() {
        for byte in 0u8..=0xFF {
            let is_tag = single_byte_tag_name(byte).is_some();
            assert_ne!(is_tag, is_single_byte_data(byte), "byte {byte:#04X}");
        }
        let passthrough: Vec<u8> = (0u8..0x20).filter(|&b| is_single_byte_data(b)).collect();
        assert_eq!(passthrough, [0x00, 0x09, 0x0A, 0x0D]);
    }

    #[test]
    fn unicode_tags_cover_contiguous_range() {
        for byte in 0u8..=0xFF {
            assert_eq!(is_unicode_tag(byte), unicode_tag_name(byte).is_some());
        }
    }

    #[test]
    fn gap_skips_low_locality_region() {
        assert_eq!(u32::from(GAP_THRESHOLD) << 7, 0x3400);
        assert_eq!((u32::from(GAP_THRESHOLD) << 7) + GAP_OFFSET, 0xE000);
        assert_eq!((u32::from(RESERVED_START - 1) << 7) + GAP_OFFSET, 0xFF80);
    }
}
