
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::deployments::{DevProfile, ModelName, SearchIndexName, semantic_config_for};
use crate::search::{DEFAULT_K_NEAREST, DEFAULT_TOP_RESULTS, DEFAULT_VECTOR_FIELD};

pub const CONFIG_FILE_NAME: &str = "config.toml";
const APP_DIR_NAME: &str = "jira-testgen";

pub const ENV_JIRA_ENDPOINT: &str = "JIRA_API_ENDPOINT";
pub const ENV_JIRA_USERNAME: &str = "JIRA_API_USERNAME";
pub const ENV_JIRA_TOKEN: &str = "JIRA_API_TOKEN";
pub const ENV_OPENAI_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const ENV_OPENAI_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ENV_SEARCH_ENDPOINT: &str = "AZURE_SEARCH_SERVICE_ENDPOINT";
pub const ENV_SEARCH_KEY: &str = "AZURE_SEARCH_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub jira: JiraConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JiraConfig {
    pub endpoint: String,
    pub username: String,
    pub api_token: String,
    /// Ticket field holding the QA description
    pub field: String,
    pub timeout_secs: u64,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            username: String::new(),
            api_token: String::new(),
            field: "description".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub embedding_model: String,
    pub test_case_model: String,
    pub code_model: String,
    pub max_tokens: usize,
    pub max_retries: u32,
    pub base_wait_secs: u64,
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            api_version: "2024-12-01-preview".to_string(),
            embedding_model: ModelName::TextEmbeddingAda002.to_string(),
            test_case_model: ModelName::Gpt35Turbo.to_string(),
            code_model: ModelName::Gpt4.to_string(),
            max_tokens: 8192,
            max_retries: 5,
            base_wait_secs: 4,
            timeout_secs: 120,
        }
    }
}

impl JiraConfig {
    #[inline]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl OpenAiConfig {
    #[inline]
    pub const fn base_wait(&self) -> Duration {
        Duration::from_secs(self.base_wait_secs)
    }

    #[inline]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Keyword and vector scoring combined
    #[default]
    Hybrid,
    /// Hybrid plus semantic reranking with extractive answers and captions
    Semantic,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub index: String,
    pub vector_field: String,
    pub k_nearest: usize,
    pub top_results: usize,
    pub mode: SearchMode,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_config: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            api_version: "2023-11-01".to_string(),
            index: SearchIndexName::TypescriptApiHelperCode.to_string(),
            vector_field: DEFAULT_VECTOR_FIELD.to_string(),
            k_nearest: DEFAULT_K_NEAREST,
            top_results: DEFAULT_TOP_RESULTS,
            mode: SearchMode::Hybrid,
            timeout_secs: 30,
            semantic_config: None,
        }
    }
}

impl SearchConfig {
    #[inline]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Explicit semantic configuration, or the index's conventional one
    #[inline]
    pub fn semantic_config_name(&self) -> String {
        self.semantic_config
            .clone()
            .unwrap_or_else(|| semantic_config_for(&self.index))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub dev_message: DevProfile,
    pub system_messages_dir: PathBuf,
    pub output_folder: PathBuf,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            dev_message: DevProfile::default(),
            system_messages_dir: PathBuf::from("system_messages"),
            output_folder: PathBuf::from("ai_generated"),
        }
    }
}

/// Which remote services a run is going to touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredServices {
    pub chat: bool,
    pub search: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL for {0}: {1}")]
    InvalidUrl(&'static str, String),
    #[error("Invalid model name for {0} (cannot be empty)")]
    InvalidModel(&'static str),
    #[error("Invalid max tokens: {0} (must be greater than 0)")]
    InvalidMaxTokens(usize),
    #[error("Invalid max retries: {0} (must be at least 1)")]
    InvalidMaxRetries(u32),
    #[error("Invalid nearest neighbour count: {0} (must be greater than 0)")]
    InvalidNearestNeighbours(usize),
    #[error("Invalid top results: {0} (must be greater than 0)")]
    InvalidTopResults(usize),
    #[error("Invalid timeout for {0} (must be at least 1 second)")]
    InvalidTimeout(&'static str),
    #[error("Invalid JIRA field (cannot be empty)")]
    InvalidField,
    #[error("Missing {setting}; set {env_var} or add it to the config file")]
    MissingSetting {
        setting: &'static str,
        env_var: &'static str,
    },
}

impl Config {
    /// Default configuration directory for this user
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILE_NAME);

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;

            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?
        } else {
            Self::default()
        };
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    /// Load from `config_dir` and apply the process environment on top
    #[inline]
    pub fn load_with_env<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let mut config = Self::load(config_dir)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
            .validate()
            .with_context(|| "Configuration validation failed after applying environment")?;
        Ok(config)
    }

    /// Override endpoints and secrets from environment variables.
    ///
    /// Empty values are ignored so an exported-but-blank variable does not
    /// clobber the file.
    #[inline]
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let targets: [(&str, &mut String); 7] = [
            (ENV_JIRA_ENDPOINT, &mut self.jira.endpoint),
            (ENV_JIRA_USERNAME, &mut self.jira.username),
            (ENV_JIRA_TOKEN, &mut self.jira.api_token),
            (ENV_OPENAI_ENDPOINT, &mut self.openai.endpoint),
            (ENV_OPENAI_KEY, &mut self.openai.api_key),
            (ENV_SEARCH_ENDPOINT, &mut self.search.endpoint),
            (ENV_SEARCH_KEY, &mut self.search.api_key),
        ];

        for (key, slot) in targets {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = value;
            }
        }
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join(CONFIG_FILE_NAME)
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jira.field.trim().is_empty() {
            return Err(ConfigError::InvalidField);
        }
        validate_optional_url("jira.endpoint", &self.jira.endpoint)?;
        for (name, secs) in [
            ("jira.timeout_secs", self.jira.timeout_secs),
            ("openai.timeout_secs", self.openai.timeout_secs),
            ("search.timeout_secs", self.search.timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::InvalidTimeout(name));
            }
        }
        self.validate_openai()?;
        self.validate_search()?;
        Ok(())
    }

    fn validate_openai(&self) -> Result<(), ConfigError> {
        let openai = &self.openai;

        validate_optional_url("openai.endpoint", &openai.endpoint)?;

        for (name, model) in [
            ("openai.embedding_model", &openai.embedding_model),
            ("openai.test_case_model", &openai.test_case_model),
            ("openai.code_model", &openai.code_model),
        ] {
            if model.trim().is_empty() {
                return Err(ConfigError::InvalidModel(name));
            }
        }

        if openai.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens(openai.max_tokens));
        }

        if openai.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries(openai.max_retries));
        }

        Ok(())
    }

    fn validate_search(&self) -> Result<(), ConfigError> {
        let search = &self.search;

        validate_optional_url("search.endpoint", &search.endpoint)?;

        if search.k_nearest == 0 {
            return Err(ConfigError::InvalidNearestNeighbours(search.k_nearest));
        }

        if search.top_results == 0 {
            return Err(ConfigError::InvalidTopResults(search.top_results));
        }

        Ok(())
    }

    /// Check that every endpoint and secret a run needs is present
    #[inline]
    pub fn require_credentials(&self, services: RequiredServices) -> Result<(), ConfigError> {
        let mut required = vec![
            ("JIRA endpoint", ENV_JIRA_ENDPOINT, &self.jira.endpoint),
            ("JIRA username", ENV_JIRA_USERNAME, &self.jira.username),
            ("JIRA API token", ENV_JIRA_TOKEN, &self.jira.api_token),
        ];

        if services.chat || services.search {
            required.push(("Azure OpenAI endpoint", ENV_OPENAI_ENDPOINT, &self.openai.endpoint));
            required.push(("Azure OpenAI API key", ENV_OPENAI_KEY, &self.openai.api_key));
        }

        if services.search {
            required.push(("Azure Search endpoint", ENV_SEARCH_ENDPOINT, &self.search.endpoint));
            required.push(("Azure Search key", ENV_SEARCH_KEY, &self.search.api_key));
        }

        match required.into_iter().find(|(_, _, value)| value.trim().is_empty()) {
            Some((setting, env_var, _)) => Err(ConfigError::MissingSetting { setting, env_var }),
            None => Ok(()),
        }
    }
}

fn validate_optional_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Ok(());
    }
    Url::parse(value).map_err(|_| ConfigError::InvalidUrl(name, value.to_string()))?;
    Ok(())
}
