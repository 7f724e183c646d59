//! Part of Component H: the pre-tokenizer chain, splitting normalized text
//! into pre-tokens before BPE runs over each one independently.

use super::byte_level;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitBehavior {
    Removed,
    Isolated,
}

impl Default for SplitBehavior {
    fn default() -> Self {
        SplitBehavior::Isolated
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PreTokenizer {
    Sequence { pretokenizers: Vec<PreTokenizer> },
    Split { pattern: String, #[serde(default)] behavior: SplitBehavior, #[serde(default)] invert: bool },
    ByteLevel { #[serde(default)] add_prefix_space: bool, #[serde(default = "default_true")] use_regex: bool },
    Metaspace,
    Whitespace,
    BertPreTokenizer,
    Replace { pattern: String, content: String },
    Precompiled,
    #[serde(other)]
    Unknown,
}

fn default_true() -> bool {
    true
}

/// GPT-2's contraction-aware split regex, used by `ByteLevel` when
/// `use_regex` is set.
static GPT2_SPLIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'s|'t|'re|'ve|'m|'ll|'d| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+").unwrap()
});

impl PreTokenizer {
    pub fn apply(&self, input: &str) -> Vec<String> {
        match self {
            PreTokenizer::Sequence { pretokenizers } => {
                let mut pieces = vec![input.to_string()];
                for p in pretokenizers {
                    pieces = pieces.iter().flat_map(|piece| p.apply(piece)).collect();
                }
                pieces
            }
            PreTokenizer::Split { pattern, behavior, invert } => split(input, pattern, *behavior, *invert),
            PreTokenizer::ByteLevel { add_prefix_space, use_regex } => {
                let text = if *add_prefix_space && !input.starts_with(' ') { format!(" {input}") } else { input.to_string() };
                let pieces: Vec<&str> = if *use_regex { GPT2_SPLIT.find_iter(&text).map(|m| m.as_str()).collect() } else { vec![&text] };
                pieces.into_iter().map(|p| byte_level::encode(p.as_bytes())).collect()
            }
            PreTokenizer::Whitespace => {
                static WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+|[^\w\s]+").unwrap());
                WS.find_iter(input).map(|m| m.as_str().to_string()).collect()
            }
            PreTokenizer::Metaspace => input.replace(' ', "\u{2581}").split_inclusive('\u{2581}').map(|s| s.to_string()).collect(),
            PreTokenizer::BertPreTokenizer => {
                static BERT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+|[^\w\s]").unwrap());
                BERT.find_iter(input).map(|m| m.as_str().to_string()).collect()
            }
            PreTokenizer::Replace { pattern, content } => {
                let replaced = if let Ok(re) = Regex::new(pattern) { re.replace_all(input, content.as_str()).into_owned() } else { input.replace(pattern, content) };
                vec![replaced]
            }
            PreTokenizer::Precompiled | PreTokenizer::Unknown => vec![input.to_string()],
        }
    }
}

fn split(input: &str, pattern: &str, behavior: SplitBehavior, invert: bool) -> Vec<String> {
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(_) => return vec![input.to_string()],
    };

    let mut pieces = Vec::new();
    let mut last = 0;
    for m in re.find_iter(input) {
        if m.start() > last {
            pieces.push((&input[last..m.start()], false));
        }
        pieces.push((m.as_str(), true));
        last = m.end();
    }
    if last < input.len() {
        pieces.push((&input[last..], false));
    }

    pieces
        .into_iter()
        .filter_map(|(piece, is_separator)| {
            let keep = is_separator != invert;
            if piece.is_empty() {
                return None;
            }
            if is_separator && behavior == SplitBehavior::Removed && !invert {
                return None;
            }
            if keep || behavior == SplitBehavior::Isolated {
                Some(piece.to_string())
            } else {
                None
            }
        })
        .collect()
}
