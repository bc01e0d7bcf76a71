use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Deserialize;

use crate::common::ChatMessage;
use crate::error::{ChatError, ChatResult};

/// Where a session gets the messages exchanged before it was mounted.
pub trait HistorySource: Send + Sync {
    fn fetch(&self, token: &str) -> BoxFuture<'static, ChatResult<Vec<ChatMessage>>>;
}

/// Authenticated GET against the storefront's chat history endpoint.
pub struct HttpHistory {
    client: reqwest::Client,
    url: String,
}

impl HttpHistory {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryBody {
    List(Vec<ChatMessage>),
    Wrapped { messages: Vec<ChatMessage> },
}

impl From<HistoryBody> for Vec<ChatMessage> {
    fn from(body: HistoryBody) -> Self {
        match body {
            HistoryBody::List(messages) | HistoryBody::Wrapped { messages } => messages,
        }
    }
}

impl HistorySource for HttpHistory {
    fn fetch(&self, token: &str) -> BoxFuture<'static, ChatResult<Vec<ChatMessage>>> {
        let request = self.client.get(&self.url).bearer_auth(token);
        let url = self.url.clone();

        async move {
            log::debug!("Fetching chat history from {url}");
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ChatError::HistoryStatus(status));
            }

            let body: HistoryBody = response.json().await?;
            let messages = Vec::from(body);
            log::debug!("History returned {} messages", messages.len());
            Ok(messages)
        }
        .boxed()
    }
}
