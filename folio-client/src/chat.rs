//! Assistant chat transcript, kept locally and mirrored to the backend.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use folio_core::constants::{CHAT_HISTORY_KEY, MAX_CONTEXT_MESSAGES};
use folio_core::error::{FolioError, Result};
use folio_core::traits::Storage;
use folio_core::types::{ChatMessage, SessionState};

use crate::api::ApiClient;

/// The chat transcript.
///
/// Every change is written to local storage. Messages added while logged in
/// are also posted to the backend; a failed post is logged and the local
/// copy kept.
pub struct ChatHistory {
    storage: Arc<dyn Storage>,
    api: ApiClient,
    messages: RwLock<Vec<ChatMessage>>,
}

impl ChatHistory {
    /// Loads the transcript from `storage`. A missing or unreadable
    /// transcript starts empty.
    pub fn new(storage: Arc<dyn Storage>, api: ApiClient) -> Self {
        let messages = Self::load_local(storage.as_ref());
        debug!(count = messages.len(), "Loaded chat history");
        Self {
            storage,
            api,
            messages: RwLock::new(messages),
        }
    }

    fn load_local(storage: &dyn Storage) -> Vec<ChatMessage> {
        let raw = match storage.get_item(CHAT_HISTORY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read chat history");
                return Vec::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "Discarding malformed chat history");
            Vec::new()
        })
    }

    fn save_local(&self, messages: &[ChatMessage]) {
        let result = serde_json::to_string(messages)
            .map_err(FolioError::from)
            .and_then(|json| self.storage.set_item(CHAT_HISTORY_KEY, &json));
        if let Err(e) = result {
            warn!(error = %e, "Failed to save chat history");
        }
    }

    /// Appends a message, persists the transcript and, when `session` is
    /// logged in, posts the message to the backend.
    pub async fn add_message(
        &self,
        text: &str,
        is_bot: bool,
        session: &SessionState,
    ) -> ChatMessage {
        let message = ChatMessage::new(text, is_bot);
        {
            let mut messages = self.messages.write();
            messages.push(message.clone());
            self.save_local(&messages);
        }

        if let Some(bearer) = session.bearer() {
            if let Err(e) = self.api.post_chat_message(&message, bearer).await {
                warn!(error = %e, "Failed to sync chat message");
            }
        }
        message
    }

    /// Replaces the local transcript with the backend's copy.
    ///
    /// Returns the number of messages loaded.
    pub async fn load_from_cloud(&self, session: &SessionState) -> Result<usize> {
        let bearer = session.bearer().ok_or(FolioError::Unauthenticated)?;
        let remote = self.api.get_chat_history(bearer).await?;
        let count = remote.len();

        let mut messages = self.messages.write();
        *messages = remote;
        self.save_local(&messages);
        info!(count, "Chat history loaded from backend");
        Ok(count)
    }

    /// The last few messages, oldest first, for use as conversation context.
    pub fn recent_context(&self) -> Vec<ChatMessage> {
        let messages = self.messages.read();
        let start = messages.len().saturating_sub(MAX_CONTEXT_MESSAGES);
        messages[start..].to_vec()
    }

    /// The whole transcript.
    pub fn all(&self) -> Vec<ChatMessage> {
        self.messages.read().clone()
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    /// True if the transcript is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    /// Empties the local transcript.
    pub fn clear(&self) {
        let mut messages = self.messages.write();
        messages.clear();
        self.save_local(&messages);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_cache::{FileStorage, MemoryStorage};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::config::ClientConfig;

    fn api(server: &MockServer) -> ApiClient {
        ApiClient::with_config(&ClientConfig::default().with_base_url(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_anonymous_messages_stay_local() {
        let server = MockServer::start().await;
        let storage = Arc::new(MemoryStorage::new());
        let history = ChatHistory::new(storage.clone(), api(&server));

        history.add_message("你好", false, &SessionState::anonymous()).await;
        history.add_message("您好!", true, &SessionState::anonymous()).await;

        assert_eq!(history.len(), 2);
        assert!(history.all()[1].is_bot);
        assert!(storage.get_item(CHAT_HISTORY_KEY).unwrap().is_some());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_logged_in_messages_are_synced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/history"))
            .and(header("authorization", "Bearer tok"))
            .and(body_partial_json(serde_json::json!({ "message": "hi", "is_bot": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;
        let history = ChatHistory::new(Arc::new(MemoryStorage::new()), api(&server));

        history.add_message("hi", false, &SessionState::new("u1", "tok")).await;
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_sync_failure_keeps_local_copy() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let history = ChatHistory::new(Arc::new(MemoryStorage::new()), api(&server));

        history.add_message("hi", false, &SessionState::new("u1", "tok")).await;
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_load_from_cloud_replaces_local() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/chat/history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [
                    { "message": "q", "is_bot": false, "timestamp": "2024-03-01T08:00:00Z" },
                    { "message": "a", "is_bot": true, "timestamp": "2024-03-01T08:00:05Z" }
                ]
            })))
            .mount(&server)
            .await;
        let history = ChatHistory::new(Arc::new(MemoryStorage::new()), api(&server));
        history.add_message("local", false, &SessionState::anonymous()).await;

        let count = history.load_from_cloud(&SessionState::new("u1", "tok")).await.unwrap();
        assert_eq!(count, 2);
        let texts: Vec<_> = history.all().into_iter().map(|m| m.message).collect();
        assert_eq!(texts, vec!["q", "a"]);
    }

    #[tokio::test]
    async fn test_load_from_cloud_requires_session() {
        let server = MockServer::start().await;
        let history = ChatHistory::new(Arc::new(MemoryStorage::new()), api(&server));
        assert_eq!(
            history.load_from_cloud(&SessionState::anonymous()).await.unwrap_err(),
            FolioError::Unauthenticated
        );
    }

    #[tokio::test]
    async fn test_recent_context_keeps_last_messages() {
        let server = MockServer::start().await;
        let history = ChatHistory::new(Arc::new(MemoryStorage::new()), api(&server));
        for i in 0..12 {
            history
                .add_message(&format!("m{}", i), i % 2 == 1, &SessionState::anonymous())
                .await;
        }

        let context = history.recent_context();
        assert_eq!(context.len(), MAX_CONTEXT_MESSAGES);
        assert_eq!(context[0].message, "m4");
        assert_eq!(context[7].message, "m11");
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("storage.json");

        {
            let storage = Arc::new(FileStorage::open(&file).unwrap());
            let history = ChatHistory::new(storage, api(&server));
            history.add_message("記得我", false, &SessionState::anonymous()).await;
        }

        let storage = Arc::new(FileStorage::open(&file).unwrap());
        let history = ChatHistory::new(storage, api(&server));
        assert_eq!(history.all()[0].message, "記得我");

        history.clear();
        assert!(history.is_empty());
        let reopened = ChatHistory::new(Arc::new(FileStorage::open(&file).unwrap()), api(&server));
        assert!(reopened.is_empty());
    }

    #[test]
    fn test_malformed_history_starts_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(CHAT_HISTORY_KEY, "{not json").unwrap();
        let api = ApiClient::with_config(&ClientConfig::default()).unwrap();
        let history = ChatHistory::new(storage, api);
        assert!(history.is_empty());
    }
}
