//! Canonical GPT-2 byte-to-visible-unicode map used by [`super::pretokenizer::PreTokenizer::ByteLevel`].
//!
//! Bytes in `[33,126] ∪ [161,172] ∪ [174,255]` map to their own code point;
//! every other byte maps to a dense allocation starting at code point 256.

use once_cell::sync::Lazy;
use std::collections::HashMap;

pub static BYTES_TO_CHAR: Lazy<[char; 256]> = Lazy::new(build_byte_to_char_map);
pub static CHAR_TO_BYTES: Lazy<HashMap<char, u8>> =
    Lazy::new(|| BYTES_TO_CHAR.iter().enumerate().map(|(b, c)| (*c, b as u8)).collect());

fn build_byte_to_char_map() -> [char; 256] {
    let mut printable: Vec<u32> = (33u32..=126).chain(161..=172).chain(174..=255).collect();
    let mut table = [' '; 256];
    let mut next_extra = 256u32;

    for b in 0u32..256 {
        if printable.contains(&b) {
            table[b as usize] = char::from_u32(b).unwrap();
        } else {
            table[b as usize] = char::from_u32(next_extra).unwrap();
            next_extra += 1;
        }
    }
    printable.clear();
    table
}

/// Re-encode raw bytes through the byte-level map into a visible string.
pub fn encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| BYTES_TO_CHAR[*b as usize]).collect()
}
