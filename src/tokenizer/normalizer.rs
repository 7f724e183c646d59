//! Part of Component H: the normalizer chain, applied before pre-tokenization.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Normalizer {
    #[serde(rename = "NFC")]
    Nfc,
    #[serde(rename = "NFKC")]
    Nfkc,
    #[serde(rename = "NFD")]
    Nfd,
    #[serde(rename = "NFKD")]
    Nfkd,
    Lowercase,
    StripAccents,
    Replace { pattern: String, content: String },
    Sequence { normalizers: Vec<Normalizer> },
    #[serde(other)]
    Unknown,
}

impl Normalizer {
    pub fn apply(&self, input: &str) -> String {
        match self {
            Normalizer::Nfc => input.nfc().collect(),
            Normalizer::Nfkc => input.nfkc().collect(),
            Normalizer::Nfd => input.nfd().collect(),
            Normalizer::Nfkd => input.nfkd().collect(),
            Normalizer::Lowercase => input.to_lowercase(),
            Normalizer::StripAccents => strip_accents(input),
            Normalizer::Replace { pattern, content } => replace_pattern(input, pattern, content),
            Normalizer::Sequence { normalizers } => {
                let mut text = input.to_string();
                for n in normalizers {
                    text = n.apply(&text);
                }
                text
            }
            Normalizer::Unknown => input.to_string(),
        }
    }
}

/// Decompose to NFD and drop combining marks (Unicode category Mn).
fn strip_accents(input: &str) -> String {
    input.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

fn is_combining_mark(c: char) -> bool {
    matches!(c as u32,
        0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F
    )
}

/// Literal or regex replacement. A pattern containing regex metacharacters
/// is compiled as a regex; a plain literal pattern is replaced verbatim.
fn replace_pattern(input: &str, pattern: &str, content: &str) -> String {
    if let Ok(re) = regex::Regex::new(pattern) {
        re.replace_all(input, content.replace('$', "$$").as_str()).into_owned()
    } else {
        input.replace(pattern, content)
    }
}
