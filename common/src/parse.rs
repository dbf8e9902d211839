//! Parsing primitives shared by the `mediameta` parsers.

mod bits;
mod fourcc;
mod reader;

pub use bits::BitReader;
pub use fourcc::FourCC;
pub use reader::{ByteReader, ReadError};
