//! Component H: BPE tokenizer. Ties the normalizer chain, pre-tokenizer
//! chain, added-token matcher, BPE merge engine, and post-processor into a
//! single `count` operation over a loaded [`TokenizerDefinition`].

pub mod added_tokens;
pub mod bpe;
pub mod byte_level;
pub mod normalizer;
pub mod pool;
pub mod post_processor;
pub mod pretokenizer;

use crate::errors::{EngineError, Result};
use added_tokens::{AddedToken, AddedTokenMatcher, Segment};
use bpe::BpeModel;
use normalizer::Normalizer;
use post_processor::PostProcessor;
use pretokenizer::PreTokenizer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// On-disk shape of `models/<name>.json`: everything needed to tokenize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizerDefinition {
    #[serde(default)]
    pub normalizer: Option<Normalizer>,
    #[serde(default)]
    pub pre_tokenizer: Option<PreTokenizer>,
    pub model: BpeModelSpec,
    #[serde(default)]
    pub added_tokens: Vec<AddedTokenSpec>,
    #[serde(default)]
    pub post_processor: Option<PostProcessor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BpeModelSpec {
    pub vocab: HashMap<String, u32>,
    pub merges: Vec<(String, String)>,
    #[serde(default)]
    pub unk_token: Option<String>,
    #[serde(default)]
    pub byte_fallback: bool,
    #[serde(default)]
    pub continuing_subword_suffix: Option<String>,
    #[serde(default)]
    pub end_of_word_suffix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddedTokenSpec {
    pub content: String,
    pub id: u32,
    #[serde(default)]
    pub single_word: bool,
    #[serde(default)]
    pub special: bool,
}

/// On-disk shape of `models/<name>_config.json`: bos/sep/eos references used
/// when no `TemplateProcessing` post-processor is configured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenizerConfig {
    #[serde(default)]
    pub bos_token: Option<String>,
    #[serde(default)]
    pub sep_token: Option<String>,
    #[serde(default)]
    pub eos_token: Option<String>,
}

/// A fully loaded, immutable tokenizer ready to count tokens. Cheap to
/// share read-only across worker threads.
pub struct Tokenizer {
    normalizer: Option<Normalizer>,
    pre_tokenizer: Option<PreTokenizer>,
    added_tokens: AddedTokenMatcher,
    model: BpeModel,
    post_processor: Option<PostProcessor>,
    config: TokenizerConfig,
}

impl Tokenizer {
    pub fn from_definition(def: TokenizerDefinition, config: TokenizerConfig) -> Self {
        let merges = def
            .model
            .merges
            .into_iter()
            .enumerate()
            .map(|(rank, (a, b))| ((a, b), rank as u32))
            .collect();
        let model = BpeModel::new(
            def.model.vocab,
            merges,
            def.model.unk_token,
            def.model.byte_fallback,
            def.model.continuing_subword_suffix,
            def.model.end_of_word_suffix,
        );
        let added_tokens = AddedTokenMatcher::new(
            def.added_tokens
                .into_iter()
                .map(|t| AddedToken { content: t.content, id: t.id, single_word: t.single_word, special: t.special })
                .collect(),
        );
        Self { normalizer: def.normalizer, pre_tokenizer: def.pre_tokenizer, added_tokens, model, post_processor: def.post_processor, config }
    }

    /// Load a tokenizer's definition + config from the state directory by name.
    pub fn load(name: &str) -> Result<Self> {
        let def_path = crate::paths::tokenizer_definition_path(name)?;
        let cfg_path = crate::paths::tokenizer_config_path(name)?;
        if !def_path.exists() {
            return Err(EngineError::TokenizerNotFound(name.to_string()));
        }
        let def_bytes = std::fs::read(&def_path)?;
        Self::from_bytes(name, &def_bytes, cfg_path.as_path())
    }

    /// Load from an already-fetched definition buffer (used by worker-pool
    /// workers that receive the buffer rather than touching the filesystem).
    pub fn from_bytes(name: &str, def_bytes: &[u8], cfg_path: &Path) -> Result<Self> {
        let def: TokenizerDefinition = serde_json::from_slice(def_bytes).map_err(|e| {
            EngineError::InvalidConfig { field: format!("tokenizer:{name}"), message: e.to_string() }
        })?;
        let config = if cfg_path.exists() {
            serde_json::from_slice(&std::fs::read(cfg_path)?)?
        } else {
            TokenizerConfig::default()
        };
        Ok(Self::from_definition(def, config))
    }

    /// Count tokens in `text`, optionally adding the fixed overhead from the
    /// post-processor template (or bos/sep/eos fallback).
    pub fn count(&self, text: &str, add_special_tokens: bool) -> usize {
        let content_count = self.count_pipeline(text);

        if !add_special_tokens {
            return content_count;
        }

        match &self.post_processor {
            Some(pp) => {
                let is_known = |id: &str| self.model.vocab.contains_key(id) || self.added_tokens.contains_content(id);
                content_count + pp.added_tokens(false, &is_known)
            }
            None => {
                let mut extra = 0;
                if self.config.bos_token.is_some() {
                    extra += 1;
                }
                if self.config.eos_token.is_some() {
                    extra += 1;
                }
                content_count + extra
            }
        }
    }

    fn count_pipeline(&self, text: &str) -> usize {
        self.added_tokens
            .split(text)
            .iter()
            .map(|segment| match segment {
                Segment::Plain(raw) => self.count_plain(raw),
                Segment::Added(_) => 1,
            })
            .sum()
    }

    fn count_plain(&self, raw: &str) -> usize {
        if raw.is_empty() {
            return 0;
        }
        let normalized = match &self.normalizer {
            Some(n) => n.apply(raw),
            None => raw.to_string(),
        };
        let pre_tokens: Vec<String> = match &self.pre_tokenizer {
            Some(pt) => pt.apply(&normalized),
            None => vec![normalized],
        };
        pre_tokens
            .iter()
            .map(|pre_token| {
                let subwords = self.model.tokenize(pre_token);
                self.model.count_subwords(&subwords)
            })
            .sum()
    }
}
