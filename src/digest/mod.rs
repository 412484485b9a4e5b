//! Digest generation
//!
//! A digest is the base-62 rendering of a 64-bit non-cryptographic hash of
//! the input string.

pub mod base62;
mod encoder;

pub use base62::{ALPHABET, MAX_LEN, decode, encode};
pub use encoder::{DigestEncoder, Xxh64Encoder};
