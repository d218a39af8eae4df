// Embeddings module
// Token-bounded chunking plus retried calls to the remote embedding service

pub mod chunking;
pub mod retry;


use std::time::Duration;
use tracing::{debug, info};

use crate::Result;
use crate::config::OpenAiConfig;
use crate::deployments::ModelName;

pub use chunking::{Chunker, DEFAULT_MAX_TOKENS};
pub use retry::{RetryPolicy, RetryState};

pub type Embedding = Vec<f32>;

/// Remote service turning one chunk of text into one vector
pub trait EmbeddingService {
    fn embed(&self, model: &str, chunk: &str) -> anyhow::Result<Embedding>;
}

impl<T: EmbeddingService + ?Sized> EmbeddingService for &T {
    #[inline]
    fn embed(&self, model: &str, chunk: &str) -> anyhow::Result<Embedding> {
        (**self).embed(model, chunk)
    }
}

type Sleeper = Box<dyn Fn(Duration) + Send + Sync>;

/// Chunks text and embeds every chunk, retrying each one independently
pub struct EmbeddingGenerator<E> {
    service: E,
    chunker: Chunker,
    max_tokens: usize,
    policy: RetryPolicy,
    sleeper: Sleeper,
}

impl<E: EmbeddingService> EmbeddingGenerator<E> {
    #[inline]
    pub fn new(service: E) -> Result<Self> {
        Ok(Self {
            service,
            chunker: Chunker::cl100k()?,
            max_tokens: DEFAULT_MAX_TOKENS,
            policy: RetryPolicy::default(),
            sleeper: Box::new(std::thread::sleep),
        })
    }

    #[inline]
    pub fn from_config(service: E, config: &OpenAiConfig) -> Result<Self> {
        let policy = RetryPolicy::new(config.max_retries, config.base_wait())?;
        Ok(Self::new(service)?
            .with_max_tokens(config.max_tokens)
            .with_retry_policy(policy))
    }

    #[inline]
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[inline]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the blocking backoff sleep, e.g. to record waits in tests
    #[inline]
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Fn(Duration) + Send + Sync + 'static,
    {
        self.sleeper = Box::new(sleeper);
        self
    }

    #[inline]
    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    #[inline]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Chunk size for `model`: the configured size, capped at the model's
    /// input ceiling when the deployment is a known one
    #[inline]
    pub fn window_for(&self, model: &str) -> usize {
        model
            .parse::<ModelName>()
            .ok()
            .and_then(ModelName::max_input_tokens)
            .map_or(self.max_tokens, |ceiling| self.max_tokens.min(ceiling))
    }

    /// Embed `text` with `model`, one vector per chunk in chunk order.
    ///
    /// Fails as a whole if any chunk exhausts its attempts; vectors already
    /// produced for earlier chunks are dropped.
    #[inline]
    pub fn generate(&self, text: &str, model: &str) -> Result<Vec<Embedding>> {
        let chunks = self.chunker.chunk(text, self.window_for(model))?;
        info!(
            "Generating embeddings for {} chunk(s) with model '{}'",
            chunks.len(),
            model
        );

        let mut embeddings = Vec::with_capacity(chunks.len());

        for (index, chunk) in chunks.iter().enumerate() {
            debug!("Embedding chunk {} ({} bytes)", index, chunk.len());
            let embedding = self.policy.run(
                |_state| self.service.embed(model, chunk),
                |wait| (self.sleeper)(wait),
            )?;
            embeddings.push(embedding);
        }

        debug!("Generated {} embedding(s)", embeddings.len());
        Ok(embeddings)
    }
}

impl<E> std::fmt::Debug for EmbeddingGenerator<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingGenerator")
            .field("max_tokens", &self.max_tokens)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
