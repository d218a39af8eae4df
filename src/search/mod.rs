//! Hybrid keyword + vector search against an Azure AI Search index.
//!
//! The query text is embedded once (first chunk only) and sent alongside the
//! raw text, so the index scores documents on both signals. Ranking belongs
//! to the index; results are returned in the order it produced them.

#[cfg(test)]
mod tests;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::config::{OpenAiConfig, SearchConfig, SearchMode};
use crate::embeddings::{Embedding, EmbeddingGenerator, EmbeddingService};
use crate::openai::{build_agent, truncate_body};
use crate::{Result, TestGenError};

pub const DEFAULT_TOP_RESULTS: usize = 5;
pub const DEFAULT_K_NEAREST: usize = 3;
pub const DEFAULT_VECTOR_FIELD: &str = "embeddings";

const SELECTED_FIELDS: [&str; 3] = ["Name", "Description", "Code"];
/// One helper method returned by the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub name: String,
    pub description: String,
    pub code: String,
}

impl SearchResult {
    #[inline]
    pub fn as_tuple(&self) -> (&str, &str, &str) {
        (&self.name, &self.description, &self.code)
    }

    #[inline]
    pub fn into_tuple(self) -> (String, String, String) {
        (self.name, self.description, self.code)
    }
}

/// Nearest-neighbour sub-query against a vector field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorQuery {
    kind: &'static str,
    pub vector: Embedding,
    pub fields: String,
    pub k: usize,
}

impl VectorQuery {
    #[inline]
    pub fn new(vector: Embedding, fields: impl Into<String>, k: usize) -> Self {
        Self {
            kind: "vector",
            vector,
            fields: fields.into(),
            k,
        }
    }
}

/// Body of a `docs/search` request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub search: String,
    pub select: String,
    pub top: usize,
    pub vector_queries: Vec<VectorQuery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_configuration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captions: Option<&'static str>,
}

impl SearchRequest {
    /// Keyword match on `text` combined with `vector_query`
    #[inline]
    pub fn hybrid(text: &str, vector_query: VectorQuery, top: usize) -> Self {
        Self {
            search: text.to_string(),
            select: SELECTED_FIELDS.join(","),
            top,
            vector_queries: vec![vector_query],
            query_type: None,
            semantic_configuration: None,
            answers: None,
            captions: None,
        }
    }

    /// Hybrid request reranked by the named semantic configuration
    #[inline]
    pub fn semantic(
        text: &str,
        vector_query: VectorQuery,
        semantic_configuration: &str,
        top: usize,
    ) -> Self {
        Self {
            query_type: Some("semantic"),
            semantic_configuration: Some(semantic_configuration.to_string()),
            answers: Some("extractive"),
            captions: Some("extractive"),
            ..Self::hybrid(text, vector_query, top)
        }
    }
}

/// Raw document as projected by the index
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchDocument {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Code", default)]
    pub code: Option<String>,
}

impl From<SearchDocument> for SearchResult {
    #[inline]
    fn from(doc: SearchDocument) -> Self {
        Self {
            name: doc.name.unwrap_or_default(),
            description: doc.description.unwrap_or_default(),
            code: doc.code.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    value: Vec<SearchDocument>,
}

/// Remote index executing a prepared request
pub trait SearchIndexService {
    fn search(&self, request: &SearchRequest) -> anyhow::Result<Vec<SearchDocument>>;
}

impl<T: SearchIndexService + ?Sized> SearchIndexService for &T {
    #[inline]
    fn search(&self, request: &SearchRequest) -> anyhow::Result<Vec<SearchDocument>> {
        (**self).search(request)
    }
}

/// What the pipeline needs: ranked helper methods for a query
pub trait HelperSearch {
    fn search(&self, query: &str, top_results: usize) -> Result<Vec<SearchResult>>;
}

/// Blocking client for one Azure AI Search index
#[derive(Debug, Clone)]
pub struct AzureSearchClient {
    base_url: Url,
    index: String,
    api_key: String,
    api_version: String,
    agent: ureq::Agent,
}

impl AzureSearchClient {
    #[inline]
    pub fn new(config: &SearchConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.endpoint)
            .with_context(|| format!("Invalid Azure Search endpoint: '{}'", config.endpoint))?;

        Ok(Self {
            base_url,
            index: config.index.clone(),
            api_key: config.api_key.clone(),
            api_version: config.api_version.clone(),
            agent: build_agent(config.timeout()),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    /// `{endpoint}/indexes/{index}/docs/search?api-version=..`
    fn search_url(&self) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("Endpoint cannot be a base URL: {}", self.base_url))?
            .pop_if_empty()
            .extend(["indexes", self.index.as_str(), "docs", "search"]);
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }
}

impl SearchIndexService for AzureSearchClient {
    fn search(&self, request: &SearchRequest) -> anyhow::Result<Vec<SearchDocument>> {
        let url = self.search_url()?;
        let request_json =
            serde_json::to_string(request).context("Failed to serialize search request")?;

        debug!("POST {} (top {})", url.path(), request.top);

        let mut response = self
            .agent
            .post(url.as_str())
            .header("api-key", self.api_key.as_str())
            .header("Content-Type", "application/json")
            .send(request_json.as_str())
            .with_context(|| format!("Search request to index '{}' failed", self.index))?;

        let status = response.status();
        let text = response
            .body_mut()
            .read_to_string()
            .context("Failed to read search response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate_body(&text)
            ));
        }

        let parsed: SearchResponse =
            serde_json::from_str(&text).context("Failed to parse search response")?;
        Ok(parsed.value)
    }
}

/// Embeds a query and runs it as a combined keyword + vector search
pub struct HybridSearchClient<E, S> {
    generator: EmbeddingGenerator<E>,
    index: S,
    embedding_model: String,
    vector_field: String,
    k_nearest: usize,
    mode: SearchMode,
    semantic_config: String,
}

impl<E: EmbeddingService, S: SearchIndexService> HybridSearchClient<E, S> {
    #[inline]
    pub fn new(generator: EmbeddingGenerator<E>, index: S, embedding_model: &str) -> Self {
        Self {
            generator,
            index,
            embedding_model: embedding_model.to_string(),
            vector_field: DEFAULT_VECTOR_FIELD.to_string(),
            k_nearest: DEFAULT_K_NEAREST,
            mode: SearchMode::Hybrid,
            semantic_config: String::new(),
        }
    }

    #[inline]
    pub fn from_config(
        generator: EmbeddingGenerator<E>,
        index: S,
        openai: &OpenAiConfig,
        search: &SearchConfig,
    ) -> Self {
        Self {
            generator,
            index,
            embedding_model: openai.embedding_model.clone(),
            vector_field: search.vector_field.clone(),
            k_nearest: search.k_nearest,
            mode: search.mode,
            semantic_config: search.semantic_config_name(),
        }
    }

    /// Embed `query` and wrap the first chunk's vector as a sub-query.
    ///
    /// Text past the first chunk is not represented in the vector; the
    /// keyword half of the search still sees the whole query.
    #[inline]
    pub fn vector_query(&self, query: &str) -> Result<VectorQuery> {
        let embeddings = self.generator.generate(query, &self.embedding_model)?;
        if embeddings.len() > 1 {
            debug!(
                "Query spans {} chunks; only the first is used for the vector query",
                embeddings.len()
            );
        }

        let vector = embeddings.into_iter().next().ok_or_else(|| {
            TestGenError::Other(anyhow!("embedding service returned no vectors"))
        })?;

        Ok(VectorQuery::new(vector, &self.vector_field, self.k_nearest))
    }

    #[inline]
    pub fn hybrid_search(&self, query: &str, top_results: usize) -> Result<Vec<SearchResult>> {
        check_top_results(top_results)?;
        let vector_query = self.vector_query(query)?;
        let request = SearchRequest::hybrid(query, vector_query, top_results);
        self.execute(&request)
    }

    #[inline]
    pub fn semantic_reranker_search(
        &self,
        query: &str,
        semantic_configuration: &str,
        top_results: usize,
    ) -> Result<Vec<SearchResult>> {
        check_top_results(top_results)?;
        let vector_query = self.vector_query(query)?;
        let request =
            SearchRequest::semantic(query, vector_query, semantic_configuration, top_results);
        self.execute(&request)
    }

    fn execute(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        let documents = self
            .index
            .search(request)
            .map_err(TestGenError::SearchService)?;

        let results: Vec<SearchResult> = documents
            .into_iter()
            .take(request.top)
            .map(SearchResult::from)
            .collect();

        info!("Search returned {} result(s)", results.len());
        Ok(results)
    }
}

impl<E: EmbeddingService, S: SearchIndexService> HelperSearch for HybridSearchClient<E, S> {
    fn search(&self, query: &str, top_results: usize) -> Result<Vec<SearchResult>> {
        match self.mode {
            SearchMode::Hybrid => self.hybrid_search(query, top_results),
            SearchMode::Semantic => {
                self.semantic_reranker_search(query, &self.semantic_config, top_results)
            }
        }
    }
}

fn check_top_results(top_results: usize) -> Result<()> {
    if top_results == 0 {
        return Err(TestGenError::InvalidInput(
            "top_results must be greater than 0".to_string(),
        ));
    }
    Ok(())
}
