// Walk an SCSU stream event by event and show how the window state evolves.
//
// Usage:
//   cargo run --example inspect_stream -- "text to encode"

use scsu::codec::decoder::{Decoder, Event};
use scsu::codec::encoder::{EncodeOptions, Encoder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let text = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Ελληνικά, 日本語のテキスト, and 𝄞 music".to_string());

    let mut enc = Encoder::with_options(Vec::new(), EncodeOptions::default());
    enc.write_str(&text)?;
    let encoded = enc.finish()?;

    let mut dec = Decoder::new(&encoded[..]);
    loop {
        let start = dec.bytes_read() as usize;
        let Some(event) = dec.next_event()? else {
            break;
        };
        let raw = &encoded[start..dec.bytes_read() as usize];
        match event {
            Event::Char(ch) => println!("{start:>5} {raw:02X?} -> {ch:?}"),
            other => println!(
                "{start:>5} {raw:02X?} -> {other:?} (mode {:?}, offsets {:04X?})",
                dec.state().mode(),
                dec.state().offsets()
            ),
        }
    }

    println!(
        "{} chars -> {} bytes",
        text.chars().count(),
        encoded.len()
    );
    Ok(())
}
