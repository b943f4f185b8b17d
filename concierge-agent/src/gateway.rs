//! Chat gateway: per-session history plus provider delegation

use crate::context::{ContextBuilder, HOTEL_NAME};
use concierge_core::config::SessionConfig;
use concierge_core::session::{HistoryEntry, SessionStore};
use concierge_core::{Error, Result};
use concierge_providers::LLMProvider;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Fixed detail reported when no provider credential is configured
pub const MISSING_KEY_MESSAGE: &str = "Gemini API key not configured";

/// Reply to a chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub session_id: String,
}

/// Acknowledgement of a session reset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetAck {
    pub message: String,
    pub session_id: String,
}

/// Liveness payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub hotel: String,
}

/// One async mutex per session id so that the append / generate / append
/// sequence of a session never interleaves with another request for it.
#[derive(Default)]
struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    fn get(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    /// Drop the lock entry if nobody but the map and `held` references it.
    fn release(&self, key: &str, held: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock();
        if Arc::strong_count(held) == 2 {
            locks.remove(key);
        }
    }
}

/// The chat gateway service
pub struct ChatGateway {
    store: Arc<dyn SessionStore>,
    provider: Option<Arc<dyn LLMProvider>>,
    context: ContextBuilder,
    settings: SessionConfig,
    locks: SessionLocks,
}

impl ChatGateway {
    /// Create a gateway over the given store.
    ///
    /// `provider` is `None` when no credential is configured; chat requests
    /// then fail with a configuration error while health checks still pass.
    pub fn new(
        store: Arc<dyn SessionStore>,
        provider: Option<Arc<dyn LLMProvider>>,
        context: ContextBuilder,
        settings: SessionConfig,
    ) -> Self {
        if provider.is_none() {
            warn!("No provider credential configured; /chat will fail until one is set");
        }
        Self {
            store,
            provider,
            context,
            settings,
            locks: SessionLocks::default(),
        }
    }

    /// Whether a provider is available
    pub fn provider_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// The session store backing this gateway
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Send a guest message and return the generated reply
    pub async fn send_message(
        &self,
        message: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Result<ChatReply> {
        let message = message.into();
        let session_id = session_id.into();

        let provider = self.provider.as_ref().ok_or_else(|| {
            error!(session_id = %session_id, "Chat rejected: {}", MISSING_KEY_MESSAGE);
            Error::Config(MISSING_KEY_MESSAGE.to_string())
        })?;

        let lock = self.locks.get(&session_id);
        let result = {
            let _guard = lock.lock().await;
            self.exchange(provider.as_ref(), message, &session_id).await
        };
        self.locks.release(&session_id, &lock);

        Ok(ChatReply {
            response: result?,
            session_id,
        })
    }

    /// Append, generate and append again; the caller holds the session lock
    async fn exchange(
        &self,
        provider: &dyn LLMProvider,
        message: String,
        session_id: &str,
    ) -> Result<String> {
        info!(
            session_id = %session_id,
            chars = message.len(),
            "Processing chat message"
        );

        self.store
            .append(session_id, HistoryEntry::user(message.clone()))
            .await?;
        self.store
            .truncate(session_id, self.settings.max_history)
            .await?;

        let history = self.store.history(session_id).await?;
        let prior = history.split_last().map(|(_, prior)| prior).unwrap_or(&[]);
        let request = self.context.build_request(prior, message);
        debug!(session_id = %session_id, prior_turns = prior.len(), "Calling provider");

        let response = match provider.generate(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(session_id = %session_id, "Provider call failed: {}", e);
                if self.settings.rollback_on_failure {
                    self.rollback_user_entry(session_id).await?;
                }
                return Err(e.into());
            }
        };

        self.store
            .append(session_id, HistoryEntry::model(response.content.clone()))
            .await?;
        let stored = self
            .store
            .truncate(session_id, self.settings.max_history)
            .await?;

        info!(
            session_id = %session_id,
            history_len = stored,
            finish_reason = %response.finish_reason,
            "Chat reply ready"
        );

        Ok(response.content)
    }

    /// Remove the user entry appended for a failed request
    async fn rollback_user_entry(&self, session_id: &str) -> Result<()> {
        self.store.pop(session_id).await?;
        if self.store.len(session_id).await? == 0 {
            self.store.delete(session_id).await?;
        }
        debug!(session_id = %session_id, "Rolled back user entry after provider failure");
        Ok(())
    }

    /// Forget a session; unknown ids are not an error
    pub async fn reset_session(&self, session_id: impl Into<String>) -> Result<ResetAck> {
        let session_id = session_id.into();

        let lock = self.locks.get(&session_id);
        let existed = {
            let _guard = lock.lock().await;
            self.store.delete(&session_id).await?
        };
        self.locks.release(&session_id, &lock);

        info!(session_id = %session_id, existed, "Conversation reset");

        Ok(ResetAck {
            message: "Conversation reset".to_string(),
            session_id,
        })
    }

    /// Fixed liveness payload
    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "ok".to_string(),
            hotel: HOTEL_NAME.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use concierge_core::session::{InMemorySessionStore, Role};
    use concierge_providers::{GenerationRequest, LLMResponse, ProviderError, ProviderResult};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Provider that records requests and answers from a script
    #[derive(Default)]
    struct ScriptedProvider {
        requests: Mutex<Vec<GenerationRequest>>,
        failures: Mutex<VecDeque<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Option<Duration>,
    }

    impl ScriptedProvider {
        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Default::default()
            }
        }

        fn fail_next(&self, detail: &str) {
            self.failures.lock().push_back(detail.to_string());
        }

        fn requests(&self) -> Vec<GenerationRequest> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn generate(&self, request: GenerationRequest) -> ProviderResult<LLMResponse> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let reply = format!("reply to {}", request.message);
            self.requests.lock().push(request);

            if let Some(detail) = self.failures.lock().pop_front() {
                return Err(ProviderError::ApiError(detail));
            }
            Ok(LLMResponse {
                content: reply,
                finish_reason: "STOP".to_string(),
                usage: HashMap::new(),
            })
        }

        fn get_default_model(&self) -> String {
            "scripted".to_string()
        }
    }

    fn gateway_with(
        provider: Option<Arc<ScriptedProvider>>,
        settings: SessionConfig,
    ) -> (ChatGateway, Arc<InMemorySessionStore>) {
        let store = Arc::new(InMemorySessionStore::new());
        let provider = provider.map(|p| p as Arc<dyn LLMProvider>);
        let gateway = ChatGateway::new(
            store.clone(),
            provider,
            ContextBuilder::with_instructions("You are a hotel assistant."),
            settings,
        );
        (gateway, store)
    }

    #[tokio::test]
    async fn test_first_message_has_no_prior_turns() {
        let provider = Arc::new(ScriptedProvider::default());
        let (gateway, store) = gateway_with(Some(provider.clone()), SessionConfig::default());

        let reply = gateway
            .send_message("What time is check-in?", "a")
            .await
            .unwrap();

        assert_eq!(reply.session_id, "a");
        assert_eq!(reply.response, "reply to What time is check-in?");

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].history.is_empty());
        assert_eq!(requests[0].message, "What time is check-in?");
        assert_eq!(requests[0].system_instruction, "You are a hotel assistant.");

        let history = store.history("a").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "What time is check-in?");
        assert_eq!(history[1].role, Role::Model);
        assert_eq!(history[1].content, reply.response);
    }

    #[tokio::test]
    async fn test_second_message_sees_prior_turns() {
        let provider = Arc::new(ScriptedProvider::default());
        let (gateway, _store) = gateway_with(Some(provider.clone()), SessionConfig::default());

        gateway.send_message("Hi", "a").await.unwrap();
        gateway.send_message("Is there a pool?", "a").await.unwrap();

        let second = &provider.requests()[1];
        assert_eq!(second.history.len(), 2);
        assert_eq!(second.history[0].content, "Hi");
        assert_eq!(second.history[1].role, Role::Model);
        assert_eq!(second.message, "Is there a pool?");
    }

    #[tokio::test]
    async fn test_history_bounded_after_many_messages() {
        let provider = Arc::new(ScriptedProvider::default());
        let (gateway, store) = gateway_with(Some(provider.clone()), SessionConfig::default());

        for i in 1..=25 {
            gateway
                .send_message(format!("message {}", i), "guest")
                .await
                .unwrap();
            assert!(store.history("guest").await.unwrap().len() <= 20);
        }

        let history = store.history("guest").await.unwrap();
        assert_eq!(history.len(), 20);
        for (offset, pair) in history.chunks(2).enumerate() {
            let call = 16 + offset;
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[0].content, format!("message {}", call));
            assert_eq!(pair[1].role, Role::Model);
            assert_eq!(pair[1].content, format!("reply to message {}", call));
        }

        // The 25th request saw the 19 entries left after trimming, minus its own.
        let last = provider.requests().pop().unwrap();
        assert_eq!(last.history.len(), 19);
        assert_eq!(last.history[0].role, Role::Model);
    }

    #[tokio::test]
    async fn test_reset_clears_history() {
        let provider = Arc::new(ScriptedProvider::default());
        let (gateway, store) = gateway_with(Some(provider.clone()), SessionConfig::default());

        gateway.send_message("Hi", "a").await.unwrap();
        let ack = gateway.reset_session("a").await.unwrap();
        assert_eq!(ack.message, "Conversation reset");
        assert_eq!(ack.session_id, "a");
        assert!(!store.contains("a").await.unwrap());

        gateway.send_message("Hello again", "a").await.unwrap();
        let last = provider.requests().pop().unwrap();
        assert!(last.history.is_empty());
    }

    #[tokio::test]
    async fn test_reset_unknown_session_succeeds() {
        let (gateway, store) = gateway_with(None, SessionConfig::default());

        let ack = gateway.reset_session("never-seen").await.unwrap();
        assert_eq!(ack.session_id, "never-seen");
        assert_eq!(store.session_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_credential_leaves_store_untouched() {
        let (gateway, store) = gateway_with(None, SessionConfig::default());

        let err = gateway.send_message("Hi", "brand-new").await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.to_string(), MISSING_KEY_MESSAGE);
        assert!(!store.contains("brand-new").await.unwrap());
        assert!(!gateway.provider_configured());
    }

    #[tokio::test]
    async fn test_provider_failure_keeps_user_entry_by_default() {
        let provider = Arc::new(ScriptedProvider::default());
        let (gateway, store) = gateway_with(Some(provider.clone()), SessionConfig::default());

        provider.fail_next("HTTP 503: overloaded");
        let err = gateway.send_message("Hi", "a").await.unwrap_err();
        match err {
            Error::Provider(detail) => assert!(detail.contains("overloaded")),
            other => panic!("unexpected error: {other:?}"),
        }

        let history = store.history("a").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);

        // A retry resends the same text as a duplicate entry.
        gateway.send_message("Hi", "a").await.unwrap();
        let retry = provider.requests().pop().unwrap();
        assert_eq!(retry.history.len(), 1);
        assert_eq!(retry.history[0].content, "Hi");
        assert_eq!(store.history("a").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_provider_failure_rolls_back_when_configured() {
        let provider = Arc::new(ScriptedProvider::default());
        let settings = SessionConfig {
            rollback_on_failure: true,
            ..Default::default()
        };
        let (gateway, store) = gateway_with(Some(provider.clone()), settings);

        provider.fail_next("boom");
        assert!(gateway.send_message("Hi", "new").await.is_err());
        assert!(!store.contains("new").await.unwrap());

        gateway.send_message("Hi", "old").await.unwrap();
        provider.fail_next("boom");
        assert!(gateway.send_message("Again", "old").await.is_err());
        let history = store.history("old").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Model);
    }

    #[tokio::test]
    async fn test_lock_entries_released_after_failed_rollback() {
        let provider = Arc::new(ScriptedProvider::default());
        let settings = SessionConfig {
            rollback_on_failure: true,
            ..Default::default()
        };
        let (gateway, store) = gateway_with(Some(provider.clone()), settings);

        for i in 0..50 {
            provider.fail_next("quota exceeded");
            assert!(gateway.send_message("hi", format!("id-{}", i)).await.is_err());
        }

        assert_eq!(store.session_count().await.unwrap(), 0);
        assert_eq!(gateway.locks.locks.lock().len(), 0);
    }

    #[tokio::test]
    async fn test_lock_entries_released_after_success() {
        let provider = Arc::new(ScriptedProvider::default());
        let (gateway, store) = gateway_with(Some(provider), SessionConfig::default());

        gateway.send_message("hi", "a").await.unwrap();
        gateway.send_message("hi", "b").await.unwrap();

        assert_eq!(store.session_count().await.unwrap(), 2);
        assert_eq!(gateway.locks.locks.lock().len(), 0);
    }

    #[tokio::test]
    async fn test_custom_history_bound() {
        let provider = Arc::new(ScriptedProvider::default());
        let settings = SessionConfig {
            max_history: 3,
            ..Default::default()
        };
        let (gateway, store) = gateway_with(Some(provider), settings);

        gateway.send_message("one", "a").await.unwrap();
        gateway.send_message("two", "a").await.unwrap();

        let history = store.history("a").await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].content, "reply to one");
        assert_eq!(history[2].content, "reply to two");
    }

    #[tokio::test]
    async fn test_whitespace_message_passes_through() {
        let provider = Arc::new(ScriptedProvider::default());
        let (gateway, _store) = gateway_with(Some(provider.clone()), SessionConfig::default());

        gateway.send_message("   ", "a").await.unwrap();
        assert_eq!(provider.requests()[0].message, "   ");
    }

    #[tokio::test]
    async fn test_concurrent_same_session_is_serialized() {
        let provider = Arc::new(ScriptedProvider::slow(Duration::from_millis(5)));
        let (gateway, store) = gateway_with(Some(provider.clone()), SessionConfig::default());
        let gateway = Arc::new(gateway);

        let mut handles = Vec::new();
        for i in 0..8 {
            let gateway = gateway.clone();
            handles.push(tokio::spawn(async move {
                gateway.send_message(format!("m{}", i), "shared").await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);
        let history = store.history("shared").await.unwrap();
        assert_eq!(history.len(), 16);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Model);
            assert_eq!(pair[1].content, format!("reply to {}", pair[0].content));
        }
        assert_eq!(gateway.locks.locks.lock().len(), 0);
    }

    #[tokio::test]
    async fn test_health_is_static() {
        let (gateway, _store) = gateway_with(None, SessionConfig::default());
        let health = gateway.health();
        assert_eq!(health.status, "ok");
        assert_eq!(health.hotel, "Seattle Marriott Bellevue");
    }
}
