//! Transport seam between the sync layer and the remote memory store.

use crate::error::TransportError;
use crate::model::MemoryRecord;
use async_trait::async_trait;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

/// One request/response exchange against the remote store.
///
/// Implementations own the wire protocol and any retry policy; this layer
/// never retries and never cancels an in-flight call.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Create a record, returning its server-assigned id.
    async fn create(
        &self,
        text: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<String, TransportError>;

    /// Fetch all records in server order.
    async fn list(&self) -> Result<Vec<MemoryRecord>, TransportError>;

    /// Fetch records ranked against a query string.
    async fn search(&self, query: &str) -> Result<Vec<MemoryRecord>, TransportError>;

    /// Replace a record's text and metadata.
    async fn update(
        &self,
        id: &str,
        text: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<bool, TransportError>;

    /// Delete a record by id.
    async fn delete(&self, id: &str) -> Result<bool, TransportError>;
}

#[derive(Serialize)]
struct CreateBody<'a> {
    text: &'a str,
    metadata: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct SearchBody<'a> {
    query: &'a str,
}

/// HTTP transport speaking the memory store's JSON API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport against the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .await
            .map_err(|err| TransportError::Decode(err.to_string()))
    }
}

fn request_error(err: reqwest::Error) -> TransportError {
    TransportError::Request(err.to_string())
}

#[async_trait]
impl Transport for HttpTransport {
    async fn create(
        &self,
        text: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<String, TransportError> {
        let response = self
            .client
            .post(self.url("/memories/"))
            .json(&CreateBody { text, metadata })
            .send()
            .await
            .map_err(request_error)?;
        let id: String = Self::decode(response).await?;
        debug!("created memory (id={id})");
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<MemoryRecord>, TransportError> {
        let response = self
            .client
            .get(self.url("/memories/"))
            .send()
            .await
            .map_err(request_error)?;
        let records: Vec<MemoryRecord> = Self::decode(response).await?;
        debug!("listed memories (count={})", records.len());
        Ok(records)
    }

    async fn search(&self, query: &str) -> Result<Vec<MemoryRecord>, TransportError> {
        let response = self
            .client
            .post(self.url("/memories/search/"))
            .json(&SearchBody { query })
            .send()
            .await
            .map_err(request_error)?;
        let records: Vec<MemoryRecord> = Self::decode(response).await?;
        debug!(
            "searched memories (query_len={}, count={})",
            query.len(),
            records.len()
        );
        Ok(records)
    }

    async fn update(
        &self,
        id: &str,
        text: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<bool, TransportError> {
        let response = self
            .client
            .put(self.url(&format!("/memories/{id}")))
            .json(&CreateBody { text, metadata })
            .send()
            .await
            .map_err(request_error)?;
        Self::decode(response).await
    }

    async fn delete(&self, id: &str) -> Result<bool, TransportError> {
        let response = self
            .client
            .delete(self.url(&format!("/memories/{id}")))
            .send()
            .await
            .map_err(request_error)?;
        let deleted: bool = Self::decode(response).await?;
        debug!("deleted memory (id={id}, deleted={deleted})");
        Ok(deleted)
    }
}
