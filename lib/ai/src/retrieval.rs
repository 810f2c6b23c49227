//! Grounding snippet retrieval.
//!
//! The query is embedded with the OpenAI embeddings endpoint and then matched
//! against a Pinecone-style vector index. Snippet text is read from a
//! metadata field on each match.

use crate::credentials::Credentials;
use crate::error::RetrievalError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::time::Duration;
use tracing::{debug, instrument};

/// A text snippet returned by the retriever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    /// Snippet text.
    pub text: String,
    /// Similarity score reported by the index.
    pub score: Option<f32>,
}

impl Snippet {
    /// Creates a snippet without a score.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            score: None,
        }
    }
}

/// Trait for similarity search over the hotel knowledge base.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Returns up to `top_k` snippets most similar to `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or the index query fails.
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        credentials: &Credentials,
    ) -> Result<Vec<Snippet>, RetrievalError>;
}

/// Configuration for the retriever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Base URL of the embeddings API.
    #[serde(default = "default_embeddings_base_url")]
    pub embeddings_base_url: String,

    /// Embedding model identifier.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Host of the vector index, for example `https://hotel-abc123.svc.pinecone.io`.
    #[serde(default)]
    pub index_host: String,

    /// Optional index namespace.
    #[serde(default)]
    pub namespace: Option<String>,

    /// Metadata field holding the snippet text.
    #[serde(default = "default_text_field")]
    pub text_field: String,

    /// Transport-level timeout in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_embeddings_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_text_field() -> String {
    "text".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            embeddings_base_url: default_embeddings_base_url(),
            embedding_model: default_embedding_model(),
            index_host: String::new(),
            namespace: None,
            text_field: default_text_field(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl RetrievalConfig {
    /// Sets the embeddings base URL.
    #[must_use]
    pub fn with_embeddings_base_url(mut self, url: impl Into<String>) -> Self {
        self.embeddings_base_url = url.into();
        self
    }

    /// Sets the index host.
    #[must_use]
    pub fn with_index_host(mut self, host: impl Into<String>) -> Self {
        self.index_host = host.into();
        self
    }
}

/// Retriever backed by OpenAI embeddings and a Pinecone index.
#[derive(Debug, Clone)]
pub struct PineconeRetriever {
    http: Client,
    config: RetrievalConfig,
}

#[derive(Serialize)]
struct EmbeddingBody<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingReply {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryReply {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    #[serde(default)]
    id: String,
    score: Option<f32>,
    #[serde(default)]
    metadata: Map<String, JsonValue>,
}

impl PineconeRetriever {
    /// Creates a retriever from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::QueryFailed`] if the HTTP client cannot be built.
    pub fn new(config: RetrievalConfig) -> Result<Self, RetrievalError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| RetrievalError::QueryFailed {
                status: None,
                reason: e.to_string(),
            })?;
        Ok(Self { http, config })
    }

    async fn embed(&self, query: &str, credentials: &Credentials) -> Result<Vec<f32>, RetrievalError> {
        let url = format!(
            "{}/embeddings",
            self.config.embeddings_base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(credentials.completion.expose())
            .json(&EmbeddingBody {
                model: &self.config.embedding_model,
                input: query,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RetrievalError::Timeout
                } else {
                    RetrievalError::EmbeddingFailed {
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::EmbeddingFailed {
                reason: format!("status {}: {body}", status.as_u16()),
            });
        }

        let reply: EmbeddingReply =
            response
                .json()
                .await
                .map_err(|e| RetrievalError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;
        reply
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| RetrievalError::ResponseParseFailed {
                reason: "no embedding in response".to_string(),
            })
    }
}

#[async_trait]
impl Retriever for PineconeRetriever {
    #[instrument(skip(self, query, credentials))]
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        credentials: &Credentials,
    ) -> Result<Vec<Snippet>, RetrievalError> {
        let index_key = credentials
            .retrieval
            .as_ref()
            .ok_or(RetrievalError::MissingCredential)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embed(query, credentials).await?;

        let url = format!("{}/query", self.config.index_host.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .header("Api-Key", index_key.expose())
            .json(&QueryBody {
                vector: &vector,
                top_k,
                include_metadata: true,
                namespace: self.config.namespace.as_deref(),
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RetrievalError::Timeout
                } else {
                    RetrievalError::QueryFailed {
                        status: None,
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::QueryFailed {
                status: Some(status.as_u16()),
                reason: response.text().await.unwrap_or_default(),
            });
        }

        let reply: QueryReply =
            response
                .json()
                .await
                .map_err(|e| RetrievalError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;

        let snippets: Vec<Snippet> = reply
            .matches
            .into_iter()
            .filter_map(|m| {
                let text = m.metadata.get(&self.config.text_field).and_then(JsonValue::as_str);
                if text.is_none() {
                    debug!(id = %m.id, field = %self.config.text_field, "match has no text field");
                }
                text.map(|text| Snippet {
                    text: text.to_string(),
                    score: m.score,
                })
            })
            .take(top_k)
            .collect();

        debug!(snippets = snippets.len(), "retrieved snippets");
        Ok(snippets)
    }
}
