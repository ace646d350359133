#![no_main]
use libfuzzer_sys::fuzz_target;
use scsu::codec::decoder;
use scsu::codec::encoder::{self, EncodeOptions, Encoder};

fuzz_target!(|data: &[u8]| {
    // Raw bytes as strict UTF-8: only malformed text may fail, and whatever
    // encodes must decode back to the same string.
    match encoder::encode_utf8(data) {
        Ok(encoded) => {
            let text = std::str::from_utf8(data).unwrap();
            assert_eq!(decoder::decode(&encoded).unwrap(), text);
        }
        Err(e) => {
            assert!(e.is_invalid_utf(), "unexpected encode error: {e}");
            assert!(std::str::from_utf8(data).is_err());
        }
    }

    // The same bytes as an SCSU stream must never panic.
    let _ = decoder::decode(data);

    if data.is_empty() {
        return;
    }

    // First byte picks the encoder thresholds.
    let flags = data[0];
    let opts = EncodeOptions {
        define_threshold: 1 + (flags & 0x07) as usize,
        unicode_threshold: 1 + ((flags >> 3) & 0x07) as usize,
    };

    // Interpret the payload as 21-bit scalars so every plane gets exercised.
    let text: String = data[1..]
        .chunks_exact(3)
        .filter_map(|c| char::from_u32(u32::from_le_bytes([c[0], c[1], c[2] & 0x1F, 0])))
        .collect();

    let mut enc = Encoder::with_options(Vec::new(), opts);
    enc.write_str(&text).unwrap();
    let encoded = enc.finish().unwrap();
    assert_eq!(decoder::decode(&encoded).unwrap(), text, "{opts:?}");

    if opts == EncodeOptions::default() {
        assert_eq!(encoder::encode_str(&text), encoded);
    }
});
