//! Primitive XDR (RFC 4506 subset) codecs shared by the registry, render,
//! and command crates.

pub mod codec;
pub mod error;

pub use codec::{FloatEndian, XDR_UNIT, pad_len};
pub use error::WireError;
