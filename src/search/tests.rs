use super::*;
use std::cell::RefCell;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::embeddings::{Chunker, RetryPolicy};

struct FixedEmbedding {
    vector: Embedding,
    calls: RefCell<Vec<String>>,
}

impl FixedEmbedding {
    fn new(vector: Embedding) -> Self {
        Self {
            vector,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl EmbeddingService for FixedEmbedding {
    fn embed(&self, _model: &str, chunk: &str) -> anyhow::Result<Embedding> {
        self.calls.borrow_mut().push(chunk.to_string());
        Ok(self.vector.clone())
    }
}

struct FailingEmbedding;

impl EmbeddingService for FailingEmbedding {
    fn embed(&self, _model: &str, _chunk: &str) -> anyhow::Result<Embedding> {
        Err(anyhow!("HTTP 503: unavailable"))
    }
}

/// Records every request and answers with canned documents
#[derive(Default)]
struct RecordingIndex {
    documents: Vec<SearchDocument>,
    requests: RefCell<Vec<SearchRequest>>,
    fail: bool,
}

impl SearchIndexService for RecordingIndex {
    fn search(&self, request: &SearchRequest) -> anyhow::Result<Vec<SearchDocument>> {
        self.requests.borrow_mut().push(request.clone());
        if self.fail {
            return Err(anyhow!("HTTP 403: Forbidden"));
        }
        Ok(self.documents.clone())
    }
}

fn document(name: &str) -> SearchDocument {
    SearchDocument {
        name: Some(name.to_string()),
        description: Some(format!("{name} description")),
        code: Some(format!("export const {name} = () => {{}};")),
    }
}

fn generator<E: EmbeddingService>(service: E) -> EmbeddingGenerator<E> {
    EmbeddingGenerator::new(service)
        .expect("generator should build")
        .with_retry_policy(
            RetryPolicy::new(2, Duration::from_secs(4)).expect("policy should build"),
        )
        .with_sleeper(|_| {})
}

#[test]
fn hybrid_request_body() {
    let request = SearchRequest::hybrid(
        "login test",
        VectorQuery::new(vec![0.5, 0.25], "embeddings", 3),
        5,
    );

    let json = serde_json::to_value(&request).expect("request should serialize");
    assert_eq!(
        json,
        serde_json::json!({
            "search": "login test",
            "select": "Name,Description,Code",
            "top": 5,
            "vectorQueries": [
                {"kind": "vector", "vector": [0.5, 0.25], "fields": "embeddings", "k": 3}
            ]
        })
    );
}

#[test]
fn semantic_request_body_adds_reranker_fields() {
    let request = SearchRequest::semantic(
        "login test",
        VectorQuery::new(vec![1.0], "embeddings", 3),
        "typescript-api-helper-code-semantic-config",
        2,
    );

    let json = serde_json::to_value(&request).expect("request should serialize");
    assert_eq!(json["queryType"], "semantic");
    assert_eq!(
        json["semanticConfiguration"],
        "typescript-api-helper-code-semantic-config"
    );
    assert_eq!(json["answers"], "extractive");
    assert_eq!(json["captions"], "extractive");
    assert_eq!(json["top"], 2);
    assert_eq!(json["select"], "Name,Description,Code");
}

#[test]
fn missing_document_fields_become_empty() {
    let result = SearchResult::from(SearchDocument {
        name: Some("loginAs".to_string()),
        description: None,
        code: None,
    });

    assert_eq!(result.as_tuple(), ("loginAs", "", ""));
}

#[test]
fn hybrid_search_embeds_query_and_projects_results() {
    let embedding = FixedEmbedding::new(vec![0.1, 0.2, 0.3]);
    let index = RecordingIndex {
        documents: vec![document("loginAs"), document("createUser")],
        ..RecordingIndex::default()
    };
    let client = HybridSearchClient::new(generator(&embedding), &index, "ada");

    let results = client
        .hybrid_search("Verify login with valid credentials", 5)
        .expect("search should succeed");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].name, "loginAs");
    assert_eq!(results[1].description, "createUser description");
    assert_eq!(
        embedding.calls.borrow().as_slice(),
        ["Verify login with valid credentials"]
    );

    let requests = index.requests.borrow();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].search, "Verify login with valid credentials");
    assert_eq!(requests[0].top, 5);
    assert_eq!(
        requests[0].vector_queries,
        vec![VectorQuery::new(vec![0.1, 0.2, 0.3], "embeddings", 3)]
    );
    assert!(requests[0].query_type.is_none());
}

#[test]
fn results_are_capped_at_top() {
    let index = RecordingIndex {
        documents: vec![document("a"), document("b"), document("c")],
        ..RecordingIndex::default()
    };
    let client = HybridSearchClient::new(generator(FixedEmbedding::new(vec![1.0])), &index, "ada");

    let results = client.hybrid_search("query", 2).expect("search should succeed");

    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["a", "b"]);
}

#[test]
fn empty_index_yields_no_results() {
    let index = RecordingIndex::default();
    let client = HybridSearchClient::new(generator(FixedEmbedding::new(vec![1.0])), &index, "ada");

    let results = client.hybrid_search("query", 5).expect("search should succeed");
    assert!(results.is_empty());
}

#[test]
fn zero_top_results_rejected_before_any_call() {
    let embedding = FixedEmbedding::new(vec![1.0]);
    let index = RecordingIndex::default();
    let client = HybridSearchClient::new(generator(&embedding), &index, "ada");

    let result = client.hybrid_search("query", 0);

    assert!(matches!(result, Err(TestGenError::InvalidInput(_))));
    assert!(embedding.calls.borrow().is_empty());
    assert!(index.requests.borrow().is_empty());
}

#[test]
fn empty_query_is_invalid_input() {
    let index = RecordingIndex::default();
    let client = HybridSearchClient::new(generator(FixedEmbedding::new(vec![1.0])), &index, "ada");

    let result = client.hybrid_search("", 5);

    assert!(matches!(result, Err(TestGenError::InvalidInput(_))));
    assert!(index.requests.borrow().is_empty());
}

#[test]
fn embedding_failure_skips_search() {
    let index = RecordingIndex::default();
    let client = HybridSearchClient::new(generator(FailingEmbedding), &index, "ada");

    let result = client.hybrid_search("query", 5);

    assert!(matches!(
        result,
        Err(TestGenError::EmbeddingGeneration { attempts: 2, .. })
    ));
    assert!(index.requests.borrow().is_empty());
}

#[test]
fn index_failure_is_search_service_error() {
    let index = RecordingIndex {
        fail: true,
        ..RecordingIndex::default()
    };
    let client = HybridSearchClient::new(generator(FixedEmbedding::new(vec![1.0])), &index, "ada");

    let result = client.hybrid_search("query", 5);

    let err = result.expect_err("index failure should propagate");
    assert!(matches!(err, TestGenError::SearchService(_)));
    assert!(err.to_string().contains("403"));
}

#[test]
fn long_query_uses_first_chunk_vector() {
    struct PerChunk;
    impl EmbeddingService for PerChunk {
        fn embed(&self, _model: &str, chunk: &str) -> anyhow::Result<Embedding> {
            Ok(vec![chunk.len() as f32])
        }
    }

    let index = RecordingIndex::default();
    let client = HybridSearchClient::new(
        generator(PerChunk).with_max_tokens(2),
        &index,
        "ada",
    );

    let query = "one two three four five";
    client.hybrid_search(query, 1).expect("search should succeed");

    let chunks = Chunker::cl100k()
        .expect("tokenizer should load")
        .chunk(query, 2)
        .expect("chunking should succeed");
    let first_len = chunks[0].len() as f32;

    let requests = index.requests.borrow();
    assert_eq!(requests[0].vector_queries[0].vector, vec![first_len]);
    assert_eq!(requests[0].search, query);
}

#[test]
fn helper_search_dispatches_on_mode() {
    let index = RecordingIndex {
        documents: vec![document("loginAs")],
        ..RecordingIndex::default()
    };
    let openai = OpenAiConfig::default();
    let search = SearchConfig {
        mode: SearchMode::Semantic,
        index: "artillery-helper-code".to_string(),
        k_nearest: 4,
        ..SearchConfig::default()
    };
    let client = HybridSearchClient::from_config(
        generator(FixedEmbedding::new(vec![1.0])),
        &index,
        &openai,
        &search,
    );

    let results = HelperSearch::search(&client, "query", 3).expect("search should succeed");

    assert_eq!(results.len(), 1);
    let requests = index.requests.borrow();
    assert_eq!(requests[0].query_type, Some("semantic"));
    assert_eq!(
        requests[0].semantic_configuration.as_deref(),
        Some("artillery-helper-code-semantic-config")
    );
    assert_eq!(requests[0].vector_queries[0].k, 4);
}

#[test]
fn search_url_layout() {
    let client = AzureSearchClient::new(&SearchConfig {
        endpoint: "https://example.search.windows.net".to_string(),
        ..SearchConfig::default()
    })
    .expect("client should build");

    let url = client.search_url().expect("url should build");
    assert_eq!(
        url.as_str(),
        "https://example.search.windows.net/indexes/typescript-api-helper-code/docs/search?api-version=2023-11-01"
    );
}

#[tokio::test]
async fn azure_search_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/indexes/typescript-api-helper-code/docs/search"))
        .and(query_param("api-version", "2023-11-01"))
        .and(header("api-key", "search-key"))
        .and(body_partial_json(serde_json::json!({
            "search": "login",
            "top": 5,
            "vectorQueries": [{"kind": "vector", "fields": "embeddings", "k": 3}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [
                {"@search.score": 0.9, "Name": "loginAs", "Description": "Logs in", "Code": "loginAs()"},
                {"@search.score": 0.5, "Name": "logout"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AzureSearchClient::new(&SearchConfig {
        endpoint: server.uri(),
        api_key: "search-key".to_string(),
        ..SearchConfig::default()
    })
    .expect("client should build")
    .with_timeout(Duration::from_secs(5));

    let request = SearchRequest::hybrid("login", VectorQuery::new(vec![0.5], "embeddings", 3), 5);
    let documents = tokio::task::spawn_blocking(move || client.search(&request))
        .await
        .expect("task should join")
        .expect("search should succeed");

    let results: Vec<SearchResult> = documents.into_iter().map(SearchResult::from).collect();
    assert_eq!(results[0].as_tuple(), ("loginAs", "Logs in", "loginAs()"));
    assert_eq!(results[1].as_tuple(), ("logout", "", ""));
}

#[tokio::test]
async fn azure_search_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("index not found"))
        .mount(&server)
        .await;

    let client = AzureSearchClient::new(&SearchConfig {
        endpoint: server.uri(),
        ..SearchConfig::default()
    })
    .expect("client should build");

    let request = SearchRequest::hybrid("q", VectorQuery::new(vec![0.5], "embeddings", 3), 5);
    let result = tokio::task::spawn_blocking(move || client.search(&request))
        .await
        .expect("task should join");

    let message = format!("{:#}", result.expect_err("404 should fail"));
    assert!(message.contains("HTTP 404"), "unexpected error: {message}");
}

#[tokio::test]
async fn configured_timeout_bounds_the_search() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"value": []}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = AzureSearchClient::new(&SearchConfig {
        endpoint: server.uri(),
        timeout_secs: 1,
        ..SearchConfig::default()
    })
    .expect("client should build");

    let request = SearchRequest::hybrid("q", VectorQuery::new(vec![0.5], "embeddings", 3), 5);
    let result = tokio::task::spawn_blocking(move || client.search(&request))
        .await
        .expect("task should join");

    assert!(result.is_err(), "slow index should time out");
}
