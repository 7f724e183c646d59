//! Part of Component H: template-aware special-token accounting. Adds the
//! fixed overhead (bos/sep/eos, or a full template) that a count-only
//! tokenizer still owes even though it never materializes token strings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TemplatePiece {
    #[serde(rename = "SpecialToken")]
    SpecialToken { id: String, type_id: u32 },
    #[serde(rename = "Sequence")]
    Sequence { id: SequenceId, type_id: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceId {
    A,
    B,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateProcessing {
    pub single: Vec<TemplatePiece>,
    #[serde(default)]
    pub pair: Vec<TemplatePiece>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PostProcessor {
    TemplateProcessing(TemplateProcessing),
    BertProcessing { sep: (String, u32), cls: (String, u32) },
    RobertaProcessing { sep: (String, u32), cls: (String, u32) },
    #[serde(other)]
    Unknown,
}

impl PostProcessor {
    /// Extra token count added on top of the sequence(s) own token counts.
    /// `is_known` reports whether a `SpecialToken` id names a token actually
    /// present in the tokenizer's vocab or added-tokens table.
    pub fn added_tokens(&self, has_pair: bool, is_known: &dyn Fn(&str) -> bool) -> usize {
        match self {
            PostProcessor::TemplateProcessing(tmpl) => {
                let template = if has_pair && !tmpl.pair.is_empty() { &tmpl.pair } else { &tmpl.single };
                template
                    .iter()
                    .filter(|piece| matches!(piece, TemplatePiece::SpecialToken { id, .. } if is_known(id)))
                    .count()
            }
            PostProcessor::BertProcessing { .. } => {
                if has_pair {
                    3
                } else {
                    2
                }
            }
            PostProcessor::RobertaProcessing { .. } => {
                if has_pair {
                    4
                } else {
                    2
                }
            }
            PostProcessor::Unknown => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(pieces: Vec<TemplatePiece>) -> TemplateProcessing {
        TemplateProcessing { single: pieces, pair: vec![] }
    }

    fn all_known(_: &str) -> bool {
        true
    }

    #[test]
    fn template_counts_special_tokens_only() {
        let pp = PostProcessor::TemplateProcessing(template(vec![
            TemplatePiece::SpecialToken { id: "[CLS]".to_string(), type_id: 0 },
            TemplatePiece::Sequence { id: SequenceId::A, type_id: 0 },
            TemplatePiece::SpecialToken { id: "[SEP]".to_string(), type_id: 0 },
        ]));
        assert_eq!(pp.added_tokens(false, &all_known), 2);
    }

    #[test]
    fn bert_processing_adds_three_for_pairs() {
        let pp = PostProcessor::BertProcessing { sep: ("[SEP]".to_string(), 102), cls: ("[CLS]".to_string(), 101) };
        assert_eq!(pp.added_tokens(true, &all_known), 3);
        assert_eq!(pp.added_tokens(false, &all_known), 2);
    }

    #[test]
    fn unknown_post_processor_adds_nothing() {
        assert_eq!(PostProcessor::Unknown.added_tokens(true, &all_known), 0);
    }

    #[test]
    fn template_falls_back_to_single_when_pair_template_empty() {
        let pp = PostProcessor::TemplateProcessing(template(vec![TemplatePiece::SpecialToken {
            id: "[CLS]".to_string(),
            type_id: 0,
        }]));
        assert_eq!(pp.added_tokens(true, &all_known), 1);
    }

    #[test]
    fn template_ignores_special_token_absent_from_vocab() {
        let pp = PostProcessor::TemplateProcessing(template(vec![
            TemplatePiece::SpecialToken { id: "[CLS]".to_string(), type_id: 0 },
            TemplatePiece::SpecialToken { id: "[MYSTERY]".to_string(), type_id: 0 },
        ]));
        let is_known = |id: &str| id == "[CLS]";
        assert_eq!(pp.added_tokens(false, &is_known), 1);
    }
}
