
use tiktoken_rs::{CoreBPE, Rank};
use tracing::debug;

use crate::{Result, TestGenError};

/// Context ceiling of the text-embedding-ada-002 deployment
pub const DEFAULT_MAX_TOKENS: usize = 8192;

/// Splits text into windows of at most `max_tokens` tokens.
///
/// Uses the `cl100k_base` byte-pair encoding, which is what the Azure
/// embedding deployments count against, so a chunk that fits here also fits
/// the remote limit.
pub struct Chunker {
    bpe: CoreBPE,
}

impl Chunker {
    #[inline]
    pub fn cl100k() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base().map_err(TestGenError::Tokenization)?;
        Ok(Self { bpe })
    }

    /// Number of tokens `text` encodes to
    #[inline]
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Split `text` into contiguous, non-overlapping token windows.
    ///
    /// Every window but the last holds exactly `max_tokens` tokens. A window
    /// edge may fall inside a multi-byte character; the partial bytes on
    /// either side decode to U+FFFD.
    #[inline]
    pub fn chunk(&self, text: &str, max_tokens: usize) -> Result<Vec<String>> {
        if text.is_empty() {
            return Err(TestGenError::InvalidInput(
                "Input text must be a non-empty string".to_string(),
            ));
        }
        if max_tokens == 0 {
            return Err(TestGenError::InvalidInput(
                "max_tokens must be a positive integer".to_string(),
            ));
        }

        let tokens = self.bpe.encode_ordinary(text);

        let chunks = tokens
            .chunks(max_tokens)
            .map(|window| self.decode_lossy(window))
            .collect::<Vec<_>>();

        debug!(
            "Split {} tokens into {} chunk(s) of at most {} tokens",
            tokens.len(),
            chunks.len(),
            max_tokens
        );

        Ok(chunks)
    }

    fn decode_lossy(&self, window: &[Rank]) -> String {
        let bytes: Vec<u8> = self
            .bpe
            ._decode_native_and_split(window.to_vec())
            .flatten()
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl std::fmt::Debug for Chunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunker")
            .field("encoding", &"cl100k_base")
            .finish()
    }
}
