#![no_main]
use libfuzzer_sys::fuzz_target;
use scsu::codec::decoder::{self, Decoder};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must only ever produce values or errors, never panics.
    let whole = decoder::decode(data);

    // The event stream must agree with the one-shot decoder.
    let mut dec = Decoder::new(data);
    let mut text = String::new();
    let streamed = loop {
        match dec.read_char() {
            Ok(Some((ch, _))) => text.push(ch),
            Ok(None) => break Ok(text),
            Err(e) => break Err(e),
        }
    };
    match (whole, streamed) {
        (Ok(a), Ok(b)) => assert_eq!(a, b),
        (Err(_), Err(_)) => {}
        (a, b) => panic!("decode mismatch: {a:?} vs {b:?}"),
    }
});
