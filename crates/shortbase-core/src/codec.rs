//! Reversible base-256 to base-62 codec.
//!
//! The codec re-bases the raw bytes of a composite key string into the
//! 62-character alphabet below. It is a bijection on well-formed keys, not a
//! hash, so two keys can never share a code.
//!
//! The alphabet order is part of the persisted format: reordering it breaks
//! every code issued so far.

use crate::error::{CoreError, Result};

/// Digits, then lowercase, then uppercase.
pub const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

const BYTE_BASE: u32 = 256;
const CODE_BASE: u32 = ALPHABET.len() as u32;

/// Encodes `text` as a base-62 string.
///
/// Every byte of `text` is treated as one base-256 digit. Empty input yields
/// an empty string.
pub fn encode(text: &str) -> String {
    let digits: Vec<u32> = text.bytes().map(u32::from).collect();

    convert_base(&digits, BYTE_BASE, CODE_BASE)
        .into_iter()
        .map(|digit| char::from(ALPHABET[digit as usize]))
        .collect()
}

/// Decodes a base-62 string produced by [`encode`].
///
/// Fails if `code` contains a character outside [`ALPHABET`].
pub fn decode(code: &str) -> Result<String> {
    let digits = code
        .bytes()
        .map(|c| {
            alphabet_index(c).ok_or_else(|| {
                CoreError::InvalidShortCode(format!(
                    "character '{}' is not in the base62 alphabet",
                    char::from(c)
                ))
            })
        })
        .collect::<Result<Vec<u32>>>()?;

    Ok(convert_base(&digits, CODE_BASE, BYTE_BASE)
        .into_iter()
        .map(|digit| char::from(digit as u8))
        .collect())
}

/// Returns `true` if `c` belongs to the codec alphabet.
pub fn is_alphabet_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

fn alphabet_index(c: u8) -> Option<u32> {
    match c {
        b'0'..=b'9' => Some(u32::from(c - b'0')),
        b'a'..=b'z' => Some(u32::from(c - b'a') + 10),
        b'A'..=b'Z' => Some(u32::from(c - b'A') + 36),
        _ => None,
    }
}

/// Arbitrary-precision base conversion by repeated long division.
///
/// `source` holds digits most-significant first; the result does too.
/// Each pass divides the whole number by `target_base`, emitting the
/// remainder as the next least-significant output digit. Leading zero
/// quotient digits are dropped so the number shrinks until exhausted.
fn convert_base(source: &[u32], source_base: u32, target_base: u32) -> Vec<u32> {
    let mut result = Vec::new();
    let mut current = source.to_vec();

    while !current.is_empty() {
        let mut quotient = Vec::with_capacity(current.len());
        let mut remainder = 0;

        for &digit in &current {
            // remainder < target_base and digit < source_base, both <= 256,
            // so the accumulator stays far below u32::MAX.
            let accumulator = remainder * source_base + digit;
            let q = accumulator / target_base;
            remainder = accumulator % target_base;

            if !quotient.is_empty() || q > 0 {
                quotient.push(q);
            }
        }

        result.push(remainder);
        current = quotient;
    }

    result.reverse();
    result
}
