//! HTTP/JSON chat backend

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::ChatBackend;
use crate::{
    error::{Error, Result},
    types::{
        Ack, ConversationId, ConversationRecord, HistoryEntry, HistoryResponse, RenameRequest,
        SendMessageRequest, SendMessageResponse,
    },
};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Chat backend over HTTP
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpBackend {
    /// Create a backend rooted at `base_url` (e.g. `http://localhost:8000/api`)
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a backend with a custom request timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::InvalidConfig(format!("invalid base URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "base URL cannot carry paths: {base_url}"
            )));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Attach a bearer token to every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidConfig(format!("base URL cannot carry paths: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        decode(status, &body)
    }
}

/// Map an HTTP status and body to a typed value
pub(crate) fn decode<T: DeserializeOwned>(status: u16, body: &str) -> Result<T> {
    if status == 401 {
        return Err(Error::Unauthorized);
    }
    if !(200..300).contains(&status) {
        return Err(Error::status(status, body));
    }
    Ok(serde_json::from_str(body)?)
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn list_conversations(&self) -> Result<Vec<ConversationRecord>> {
        let url = self.endpoint(&["chat", "conversations"])?;
        tracing::debug!(%url, "listing conversations");
        self.execute(self.request(Method::GET, url)).await
    }

    async fn create_conversation(&self) -> Result<ConversationRecord> {
        let url = self.endpoint(&["chat", "new"])?;
        tracing::debug!(%url, "creating conversation");
        self.execute(self.request(Method::POST, url)).await
    }

    async fn send_message(&self, request: &SendMessageRequest) -> Result<SendMessageResponse> {
        let url = self.endpoint(&["chat", "message"])?;
        tracing::debug!(
            %url,
            conversation = ?request.conversation_id,
            chars = request.message.chars().count(),
            "sending message"
        );
        self.execute(self.request(Method::POST, url).json(request))
            .await
    }

    async fn get_history(&self, conversation_id: &ConversationId) -> Result<Vec<HistoryEntry>> {
        let url = self.endpoint(&["chat", "history", conversation_id.as_str()])?;
        tracing::debug!(%url, "loading history");
        let history: HistoryResponse = self.execute(self.request(Method::GET, url)).await?;
        Ok(history.into_entries())
    }

    async fn rename_conversation(&self, conversation_id: &ConversationId, name: &str) -> Result<()> {
        let url = self.endpoint(&["chat", "conversations", conversation_id.as_str()])?;
        tracing::debug!(%url, "renaming conversation");
        let ack: Ack = self
            .execute(self.request(Method::PUT, url).json(&RenameRequest { name }))
            .await?;
        ack.ensure("rename")
    }

    async fn delete_conversation(&self, conversation_id: &ConversationId) -> Result<()> {
        let url = self.endpoint(&["chat", "conversations", conversation_id.as_str()])?;
        tracing::debug!(%url, "deleting conversation");
        let ack: Ack = self.execute(self.request(Method::DELETE, url)).await?;
        ack.ensure("delete")
    }
}
