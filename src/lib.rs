use thiserror::Error;

pub type Result<T> = std::result::Result<T, TestGenError>;

#[derive(Error, Debug)]
pub enum TestGenError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unable to split text into chunks: {0}")]
    Tokenization(#[source] anyhow::Error),

    #[error("Unable to generate embeddings after {attempts} attempts: {source}")]
    EmbeddingGeneration {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("Search service error: {0}")]
    SearchService(#[source] anyhow::Error),

    #[error("Error retrieving JIRA ticket {ticket}: {message}")]
    TicketRetrieval { ticket: String, message: String },

    #[error("Chat completion error: {0}")]
    ChatCompletion(#[source] anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chat;
pub mod config;
pub mod deployments;
pub mod embeddings;
pub mod jira;
pub mod logging;
pub mod openai;
pub mod output;
pub mod pipeline;
pub mod search;
