// Configuration management module
// TOML settings file, environment overrides and the `--show-config` report

pub mod settings;
pub mod show;

pub use settings::{
    Config, ConfigError, GenerationConfig, JiraConfig, OpenAiConfig, RequiredServices,
    SearchConfig, SearchMode,
};
pub use show::show_config;

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
