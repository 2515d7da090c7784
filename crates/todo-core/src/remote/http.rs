//! JSON-over-HTTP client for the remote todo service.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{RemoteError, RemoteResult, TodoApi};
use crate::models::{TodoId, TodoItem};
use crate::util::compact_text;

/// HTTP client for a todo service exposing `GET/POST /todos` and
/// `GET/PUT/DELETE /todos/{id}`.
#[derive(Debug, Clone)]
pub struct HttpTodoApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTodoApi {
    /// Builds a client for an explicit API base URL.
    ///
    /// `timeout` bounds each request end to end; `None` leaves requests
    /// unbounded.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> RemoteResult<Self> {
        let base_url = normalize_base_url(base_url.into().as_str())?;
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self { base_url, client })
    }

    /// Returns the base URL this client was configured with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}/todos", self.base_url)
    }

    fn item_url(&self, id: &TodoId) -> String {
        format!("{}/todos/{}", self.base_url, urlencoding::encode(id.as_str()))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> RemoteResult<String> {
        let response = request.header("Accept", "application/json").send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(RemoteError::Api {
                status: status.as_u16(),
                message: compact_text(&body),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl TodoApi for HttpTodoApi {
    async fn list_all(&self) -> RemoteResult<Vec<TodoItem>> {
        let body = self.send(self.client.get(self.collection_url())).await?;
        parse_body(&body)
    }

    async fn get(&self, id: &TodoId) -> RemoteResult<TodoItem> {
        let body = self.send(self.client.get(self.item_url(id))).await?;
        parse_body(&body)
    }

    async fn create(&self, item: &TodoItem) -> RemoteResult<TodoItem> {
        let body = self
            .send(self.client.post(self.collection_url()).json(item))
            .await?;
        parse_body(&body)
    }

    async fn update(&self, id: &TodoId, item: &TodoItem) -> RemoteResult<Option<TodoItem>> {
        let body = self
            .send(self.client.put(self.item_url(id)).json(item))
            .await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        parse_body(&body).map(Some)
    }

    async fn delete(&self, id: &TodoId) -> RemoteResult<()> {
        self.send(self.client.delete(self.item_url(id))).await?;
        Ok(())
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> RemoteResult<T> {
    serde_json::from_str(body).map_err(|error| {
        RemoteError::InvalidPayload(format!("{error} (body: {})", compact_text(body)))
    })
}

fn normalize_base_url(raw: &str) -> RemoteResult<String> {
    let base = raw.trim().trim_end_matches('/').to_string();
    if base.is_empty() {
        return Err(RemoteError::NotConfigured);
    }
    if !crate::util::is_http_url(&base) {
        return Err(RemoteError::InvalidPayload(format!(
            "API base URL must include http:// or https://: {base}"
        )));
    }
    Ok(base)
}
