
use console::style;

use super::{Config, SearchMode};

#[inline]
pub fn show_config(config: &Config) {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("JIRA Settings:").bold().yellow());
    eprintln!("  Endpoint: {}", display_value(&config.jira.endpoint));
    eprintln!("  Username: {}", display_value(&config.jira.username));
    eprintln!("  API Token: {}", display_secret(&config.jira.api_token));
    eprintln!("  Field: {}", style(&config.jira.field).cyan());
    eprintln!("  Timeout: {}s", style(config.jira.timeout_secs).cyan());

    eprintln!();
    eprintln!("{}", style("Azure OpenAI Settings:").bold().yellow());
    eprintln!("  Endpoint: {}", display_value(&config.openai.endpoint));
    eprintln!("  API Key: {}", display_secret(&config.openai.api_key));
    eprintln!("  API Version: {}", style(&config.openai.api_version).cyan());
    eprintln!(
        "  Embedding Model: {}",
        style(&config.openai.embedding_model).cyan()
    );
    eprintln!(
        "  Test Case Model: {}",
        style(&config.openai.test_case_model).cyan()
    );
    eprintln!("  Code Model: {}", style(&config.openai.code_model).cyan());
    eprintln!("  Max Tokens: {}", style(config.openai.max_tokens).cyan());
    eprintln!(
        "  Retries: {} (base wait {}s)",
        style(config.openai.max_retries).cyan(),
        style(config.openai.base_wait_secs).cyan()
    );
    eprintln!("  Timeout: {}s", style(config.openai.timeout_secs).cyan());

    eprintln!();
    eprintln!("{}", style("Azure Search Settings:").bold().yellow());
    eprintln!("  Endpoint: {}", display_value(&config.search.endpoint));
    eprintln!("  Key: {}", display_secret(&config.search.api_key));
    eprintln!("  Index: {}", style(&config.search.index).cyan());
    eprintln!(
        "  Vector Field: {} (k = {})",
        style(&config.search.vector_field).cyan(),
        style(config.search.k_nearest).cyan()
    );
    eprintln!("  Top Results: {}", style(config.search.top_results).cyan());
    eprintln!("  Timeout: {}s", style(config.search.timeout_secs).cyan());
    match config.search.mode {
        SearchMode::Hybrid => eprintln!("  Mode: {}", style("hybrid").cyan()),
        SearchMode::Semantic => eprintln!(
            "  Mode: {} ({})",
            style("semantic").cyan(),
            style(config.search.semantic_config_name()).cyan()
        ),
    }

    eprintln!();
    eprintln!("{}", style("Generation Settings:").bold().yellow());
    eprintln!(
        "  Dev Message: {}",
        style(config.generation.dev_message).cyan()
    );
    eprintln!(
        "  System Messages: {}",
        style(config.generation.system_messages_dir.display()).cyan()
    );
    eprintln!(
        "  Output Folder: {}",
        style(config.generation.output_folder.display()).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
}

fn display_value(value: &str) -> String {
    if value.is_empty() {
        style("(not set)").red().to_string()
    } else {
        style(value).cyan().to_string()
    }
}

fn display_secret(value: &str) -> String {
    if value.is_empty() {
        style("(not set)").red().to_string()
    } else {
        style(mask_secret(value)).cyan().to_string()
    }
}

/// Keep the last four characters of a secret visible
pub(crate) fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let visible: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), visible)
}
