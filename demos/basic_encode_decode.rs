use scsu::codec::decoder;
use scsu::codec::encoder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let text = "Съешь же ещё этих мягких французских булок, да выпей чаю.";

    let encoded = encoder::encode_str(text);
    let restored = decoder::decode(&encoded)?;
    assert_eq!(restored, text);

    println!(
        "{} chars: UTF-8 {} bytes, UTF-16 {} bytes, SCSU {} bytes",
        text.chars().count(),
        text.len(),
        2 * text.encode_utf16().count(),
        encoded.len()
    );

    Ok(())
}
