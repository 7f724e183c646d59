//! Wire-level request/response types shared by all three backend dialects.

use serde::{Deserialize, Serialize};

/// A chat message. `content` is either plain text or an ordered list of
/// parts, so a single user turn can mix text and inline images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: crate::job::Role,
    pub content: Content,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self { role: crate::job::Role::System, content: Content::Text(text.into()) }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self { role: crate::job::Role::User, content: Content::Text(text.into()) }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: crate::job::Role::Assistant, content: Content::Text(text.into()) }
    }

    pub fn user_with_images(text: impl Into<String>, images: &[String]) -> Self {
        if images.is_empty() {
            return Self::user(text);
        }
        let mut parts = vec![ContentPart::Text { text: text.into() }];
        parts.extend(images.iter().map(|url| ContentPart::ImageUrl { image_url: ImageUrl { url: url.clone() } }));
        Self { role: crate::job::Role::User, content: Content::Parts(parts) }
    }

    pub fn text(&self) -> String {
        match &self.content {
            Content::Text(t) => t.clone(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.clone()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// Per-request accumulator for reasoning/chain-of-thought content extracted
/// from responses-dialect events. Owned by one [`crate::api::LlmClient`]
/// call; never shared across clients or requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReasoningState {
    pub encrypted_blob: Option<String>,
    pub unencrypted_text: Option<String>,
    pub summary: Option<String>,
}

impl ReasoningState {
    pub fn is_empty(&self) -> bool {
        self.encrypted_blob.is_none() && self.unencrypted_text.is_none() && self.summary.is_none()
    }
}

/// Per-call overrides applied on top of the job's configured knobs; used by
/// the retry loop to bump temperature without mutating the job state.
#[derive(Debug, Clone, Default)]
pub struct CallOverrides {
    pub temperature: Option<f32>,
}
