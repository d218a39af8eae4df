//! Chat history types and the chat completion seam.
//!
//! A [`ChatHistory`] is an owned value: each pipeline stage builds its own
//! history and hands it to a [`ChatCompletionService`] by reference.


use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub content: String,
}

impl ChatEntry {
    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered conversation sent to the completion endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatHistory(Vec<ChatEntry>);

impl ChatHistory {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with(mut self, entry: ChatEntry) -> Self {
        self.0.push(entry);
        self
    }

    #[inline]
    pub fn push(&mut self, entry: ChatEntry) {
        self.0.push(entry);
    }

    #[inline]
    pub fn entries(&self) -> &[ChatEntry] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<ChatEntry>> for ChatHistory {
    #[inline]
    fn from(entries: Vec<ChatEntry>) -> Self {
        Self(entries)
    }
}

/// Temperature and nucleus sampling sent with a completion request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
}

impl SamplingParams {
    /// Low-variance sampling used for code generation
    pub const PRECISE: Self = Self {
        temperature: 0.2,
        top_p: 0.1,
    };
}

impl Default for SamplingParams {
    #[inline]
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 1.0,
        }
    }
}

pub trait ChatCompletionService {
    /// Run the conversation and return the assistant's reply
    fn complete(
        &self,
        model: &str,
        history: &ChatHistory,
        sampling: SamplingParams,
    ) -> Result<String>;
}

/// Read a system prompt, flattening newlines into spaces
#[inline]
pub fn system_message_from_file(path: &Path) -> Result<ChatEntry> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read system message: {}", path.display()))?;

    Ok(ChatEntry::system(content.replace('\n', " ").trim_end()))
}
