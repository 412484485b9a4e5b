use xxhash_rust::xxh64::xxh64;

use super::base62;

/// Maps an input string to a short digest. Must be deterministic.
pub trait DigestEncoder: Send + Sync {
    fn encode(&self, input: &str) -> String;
}

/// xxHash64 (seed 0) rendered in base 62.
#[derive(Debug, Clone, Copy, Default)]
pub struct Xxh64Encoder;

impl Xxh64Encoder {
    pub fn hash(input: &str) -> u64 {
        xxh64(input.as_bytes(), 0)
    }
}

impl DigestEncoder for Xxh64Encoder {
    fn encode(&self, input: &str) -> String {
        base62::encode(Self::hash(input))
    }
}

impl<F> DigestEncoder for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn encode(&self, input: &str) -> String {
        self(input)
    }
}
