//! Named Azure deployments, search indexes and system prompts.
//!
//! These are closed sets: anything not listed here has to be passed as a
//! free-form string through configuration or the `--model` flag.


use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Deployed Azure OpenAI models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelName {
    Gpt35Turbo,
    Gpt4,
    Gpt4o,
    TextEmbeddingAda002,
}

impl ModelName {
    pub const ALL: [Self; 4] = [
        Self::Gpt35Turbo,
        Self::Gpt4,
        Self::Gpt4o,
        Self::TextEmbeddingAda002,
    ];

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gpt35Turbo => "GPT-35-Turbo",
            Self::Gpt4 => "GPT-4",
            Self::Gpt4o => "GPT-4o",
            Self::TextEmbeddingAda002 => "text-embedding-ada-002",
        }
    }

    /// Token ceiling enforced by the embedding endpoint for this model
    #[inline]
    pub const fn max_input_tokens(self) -> Option<usize> {
        match self {
            Self::TextEmbeddingAda002 => Some(8192),
            _ => None,
        }
    }
}

impl fmt::Display for ModelName {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelName {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown model deployment: {s}"))
    }
}

/// Azure AI Search indexes holding helper code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchIndexName {
    ArtilleryHelperCode,
    TypescriptApiHelperCode,
    TypescriptUiHelperCode,
}

impl SearchIndexName {
    pub const ALL: [Self; 3] = [
        Self::ArtilleryHelperCode,
        Self::TypescriptApiHelperCode,
        Self::TypescriptUiHelperCode,
    ];

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ArtilleryHelperCode => "artillery-helper-code",
            Self::TypescriptApiHelperCode => "typescript-api-helper-code",
            Self::TypescriptUiHelperCode => "typescript-ui-helper-code",
        }
    }

    /// Name of the semantic ranking profile configured on the index
    #[inline]
    pub fn semantic_config(self) -> String {
        semantic_config_for(self.as_str())
    }
}

impl fmt::Display for SearchIndexName {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchIndexName {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| format!("Unknown search index: {s}"))
    }
}

/// Semantic configuration naming convention shared by every index
#[inline]
pub fn semantic_config_for(index: &str) -> String {
    format!("{index}-semantic-config")
}

/// System prompts shipped in the system messages directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemMessage {
    ArtilleryDev,
    ChatSummary,
    Qa,
    TypeScriptApiDev,
    TypeScriptUiDev,
}

impl SystemMessage {
    pub const ALL: [Self; 5] = [
        Self::ArtilleryDev,
        Self::ChatSummary,
        Self::Qa,
        Self::TypeScriptApiDev,
        Self::TypeScriptUiDev,
    ];

    #[inline]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::ArtilleryDev => "artillery_dev_message.txt",
            Self::ChatSummary => "chat_summary_message.txt",
            Self::Qa => "qa_message.txt",
            Self::TypeScriptApiDev => "typescript_api_dev_message.txt",
            Self::TypeScriptUiDev => "typescript_ui_dev_message.txt",
        }
    }

    #[inline]
    pub fn path_in(self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

/// Which developer prompt drives code generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DevProfile {
    #[default]
    TypescriptApi,
    TypescriptUi,
    Artillery,
}

impl DevProfile {
    #[inline]
    pub const fn system_message(self) -> SystemMessage {
        match self {
            Self::TypescriptApi => SystemMessage::TypeScriptApiDev,
            Self::TypescriptUi => SystemMessage::TypeScriptUiDev,
            Self::Artillery => SystemMessage::ArtilleryDev,
        }
    }

    /// Index whose helper code matches this profile
    #[inline]
    pub const fn search_index(self) -> SearchIndexName {
        match self {
            Self::TypescriptApi => SearchIndexName::TypescriptApiHelperCode,
            Self::TypescriptUi => SearchIndexName::TypescriptUiHelperCode,
            Self::Artillery => SearchIndexName::ArtilleryHelperCode,
        }
    }
}

impl fmt::Display for DevProfile {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TypescriptApi => "typescript-api",
            Self::TypescriptUi => "typescript-ui",
            Self::Artillery => "artillery",
        })
    }
}
