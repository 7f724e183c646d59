//! Data model: [`SourceJob`], the resumable [`ProgressRecord`], and the
//! typed [`Knob`] / [`PromptTuple`] value representations.
//!
//! Replaces the tuple-based `(enabled, value[, role, isDefault])` knob
//! representation with a tagged variant, per the ownership re-architecture:
//! emission to JSON payloads checks the tag instead of array shape.

use serde::{Deserialize, Serialize};

/// A configuration value that is only sent to the backend when enabled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Knob<T> {
    Disabled,
    Enabled(T),
}

impl<T> Knob<T> {
    pub fn enabled(value: T) -> Self {
        Knob::Enabled(value)
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Knob::Enabled(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Knob::Enabled(v) => Some(v),
            Knob::Disabled => None,
        }
    }
}

impl<T> Default for Knob<T> {
    fn default() -> Self {
        Knob::Disabled
    }
}

/// Role a [`PromptTuple`] or [`crate::api::Message`] is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Carries both the content and whether to use it, plus the role it should
/// be attached under and whether that role is the implicit default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTuple {
    pub enabled: bool,
    pub text: String,
    pub role: Role,
    pub is_default: bool,
}

impl PromptTuple {
    pub fn disabled(role: Role) -> Self {
        Self { enabled: false, text: String::new(), role, is_default: true }
    }

    pub fn new(text: impl Into<String>, role: Role) -> Self {
        Self { enabled: true, text: text.into(), role, is_default: false }
    }
}

/// Persisted, resumable state for one batch job. Keyed by `fingerprint.json`
/// in the state directory. On load, fully reconstructs job configuration —
/// CLI options supplied for a resumed job are ignored in favor of this
/// record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub file_name: String,
    pub chunk_index: usize,
    pub url: String,
    pub api_key: String,
    pub delay: u64,
    pub max_attempts: u32,
    pub temp_increment: f32,
    pub model: Knob<String>,
    pub temperature: Knob<f32>,
    pub top_p: Knob<f32>,
    pub top_k: Knob<u32>,
    pub presence_penalty: Knob<f32>,
    pub seed: Knob<u64>,
    pub timeout: u64,
    pub system_prompt: PromptTuple,
    pub prepend_prompt: PromptTuple,
    pub prefill: PromptTuple,
    pub chunk_size: usize,
    pub batch_size: usize,
    pub parallel: usize,
    pub reasoning_effort: Knob<String>,
    pub enable_thinking: Knob<bool>,
}

impl ProgressRecord {
    /// `true` once every chunk in the job has been processed.
    pub fn is_complete(&self, total_chunks: usize) -> bool {
        self.chunk_index >= total_chunks
    }
}

/// Options as they arrive from the CLI, before resolution against a
/// possibly-resumed [`ProgressRecord`]. Every numeric/string knob here maps
/// 1:1 to a [`crate::resolver::FieldEntry`] in the configuration resolver.
#[derive(Debug, Clone, Default)]
pub struct JobOptions {
    pub source_path: std::path::PathBuf,
    pub target_path: std::path::PathBuf,
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub delay: Option<u64>,
    pub max_attempts: Option<u32>,
    pub temp_increment: Option<f32>,
    pub timeout_minutes: Option<u64>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub presence_penalty: Option<f32>,
    pub seed: Option<u64>,
    pub system_prompt: Option<String>,
    pub prepend_prompt: Option<String>,
    pub prefill: Option<String>,
    pub chunk_size: Option<usize>,
    pub batch_size: Option<usize>,
    pub parallel: Option<usize>,
    pub images: Vec<String>,
    pub reasoning_effort: Option<String>,
    pub enable_thinking: Option<bool>,
    pub verbose: bool,
}

/// In-memory job state: source text split into ordered chunks, with the
/// index of the next chunk to process. `chunk_index == chunks.len()` means
/// the job is complete.
pub struct SourceJob {
    pub source_path: std::path::PathBuf,
    pub target_path: std::path::PathBuf,
    pub fingerprint: String,
    pub chunks: Vec<String>,
    pub chunk_index: usize,
}

impl SourceJob {
    pub fn new(source_path: std::path::PathBuf, target_path: std::path::PathBuf, text: &str, lines_per_chunk: usize) -> Self {
        let fingerprint = crate::fingerprint::fingerprint(text);
        let chunks = crate::chunker::chunk(text, lines_per_chunk);
        Self { source_path, target_path, fingerprint, chunks, chunk_index: 0 }
    }

    pub fn is_complete(&self) -> bool {
        self.chunk_index >= self.chunks.len()
    }

    pub fn next_batch(&self, batch_size: usize) -> &[String] {
        let end = (self.chunk_index + batch_size).min(self.chunks.len());
        &self.chunks[self.chunk_index..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knob_disabled_by_default() {
        let knob: Knob<f32> = Knob::default();
        assert!(!knob.is_enabled());
        assert_eq!(knob.value(), None);
    }

    #[test]
    fn knob_enabled_carries_value() {
        let knob = Knob::enabled(0.7_f32);
        assert!(knob.is_enabled());
        assert_eq!(knob.value(), Some(&0.7));
    }

    #[test]
    fn source_job_tracks_completion() {
        let job = SourceJob::new("s".into(), "t".into(), "a\nb\nc", 1);
        assert_eq!(job.chunks.len(), 3);
        assert!(!job.is_complete());
    }

    #[test]
    fn next_batch_caps_at_remaining_chunks() {
        let job = SourceJob::new("s".into(), "t".into(), "a\nb", 1);
        assert_eq!(job.next_batch(10).len(), 2);
    }
}
