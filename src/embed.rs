//! Embedding client
//!
//! The index treats embedding as an opaque function `text -> [f32; D]`. This
//! module pins that seam down as the [`Embedder`] trait — a batch entry
//! point for corpus builds and a single-text one for query time — plus an
//! HTTP-backed implementation against a remote embedding service. Swapping
//! models or providers never touches the index.
//!
//! The only contract the index relies on is that D stays constant between
//! build and query; the shape checks here fail fast when a service breaks
//! that.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default embedding model, matching the corpus the service was built with.
pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Texts sent per embedding request during corpus builds.
pub const DEFAULT_BATCH_SIZE: usize = 64;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("embedding service returned {got} vectors for {sent} texts")]
    ShapeMismatch { sent: usize, got: usize },
}

/// Text-to-vector interface consumed by the build pipeline and the server.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per text, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or(EmbedError::ShapeMismatch { sent: 1, got: 0 })
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// [`Embedder`] backed by a remote embedding HTTP API.
///
/// Expects `POST {base_url}/embed` with `{"model", "texts"}` to return
/// `{"embeddings": [[f32, ...], ...]}` in input order.
pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    batch_size: usize,
}

impl HttpEmbedder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    async fn request_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let url = format!("{}/embed", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                texts,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbedError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: EmbedResponse = response.json().await?;
        if body.embeddings.len() != texts.len() {
            return Err(EmbedError::ShapeMismatch {
                sent: texts.len(),
                got: body.embeddings.len(),
            });
        }
        Ok(body.embeddings)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            vectors.extend(self.request_chunk(chunk).await?);
        }
        Ok(vectors)
    }
}
