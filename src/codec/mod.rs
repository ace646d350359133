// Standard Compression Scheme for Unicode (UTS #6).
//
// # Modules
//
// - `tags`   : Command bytes and offset tables
// - `window` : Per-stream window state and offset derivation
// - `decoder`: Command interpretation, scalar value reconstruction
// - `encoder`: Window selection and mode switching

pub mod decoder;
pub mod encoder;
pub mod tags;
pub mod window;

// Re-export key types for convenience.
pub use decoder::{DecodeError, Decoder, Event, decode};
pub use encoder::{
    EncodeError, EncodeOptions, Encoder, encode_all, encode_into, encode_str, encode_utf8,
};
pub use window::{InvalidWindowOffset, Mode, WindowState};
