pub mod constants;
pub mod text;

pub use constants::*;
pub use text::{decode_utf8_lossy, decode_utf8_strict, mime_essence};
