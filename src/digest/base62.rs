//! Base-62 radix codec for `u64` values.

/// Symbol order is part of the digest format: digits, then uppercase, then lowercase.
pub const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

pub const RADIX: u64 = 62;

/// Longest possible encoding of a `u64` (62^11 > 2^64).
pub const MAX_LEN: usize = 11;

/// Encode `num` most-significant symbol first.
///
/// Zero encodes to `"0"` rather than the empty string, so every value has a
/// usable, non-empty representation.
pub fn encode(mut num: u64) -> String {
    if num == 0 {
        return "0".to_string();
    }

    let mut buf = [0u8; MAX_LEN];
    let mut pos = MAX_LEN;
    while num > 0 {
        pos -= 1;
        buf[pos] = ALPHABET[(num % RADIX) as usize];
        num /= RADIX;
    }

    // 字母表全部是 ASCII
    buf[pos..].iter().map(|&b| b as char).collect()
}

fn symbol_value(symbol: u8) -> Option<u64> {
    let value = match symbol {
        b'0'..=b'9' => symbol - b'0',
        b'A'..=b'Z' => symbol - b'A' + 10,
        b'a'..=b'z' => symbol - b'a' + 36,
        _ => return None,
    };
    Some(value as u64)
}

/// Inverse of [`encode`]. Returns `None` for empty input, foreign symbols or overflow.
pub fn decode(digest: &str) -> Option<u64> {
    if digest.is_empty() || digest.len() > MAX_LEN {
        return None;
    }

    digest.bytes().try_fold(0u64, |acc, symbol| {
        acc.checked_mul(RADIX)?.checked_add(symbol_value(symbol)?)
    })
}

/// True if `digest` could have been produced by [`encode`].
pub fn is_valid(digest: &str) -> bool {
    decode(digest).is_some()
}
