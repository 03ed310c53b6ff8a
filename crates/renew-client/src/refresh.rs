//! Single-flight refresh of the stored credential pair.
//!
//! The first caller that finds no refresh in flight becomes the driver and
//! performs the exchange. Every caller arriving while the exchange runs is
//! parked on a oneshot channel and receives a clone of the driver's outcome.
//! The in-flight flag and the waiter list live behind one mutex that is
//! never held across an `.await`: claiming the driver role and settling the
//! outcome are each a single critical section.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use renew_keystore::{CredentialPair, CredentialStore};
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_REFRESH_PATH;
use crate::{RefreshError, RequestDescriptor, Transport};

type Outcome = Result<String, RefreshError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSettings {
    pub refresh_path: String,
    pub wait_timeout: Option<Duration>,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            wait_timeout: None,
        }
    }
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<Outcome>>,
}

enum Role {
    Driver(String),
    Waiter(oneshot::Receiver<Outcome>),
}

pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    settings: RefreshSettings,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        settings: RefreshSettings,
    ) -> Self {
        Self {
            transport,
            store,
            settings,
            state: Mutex::new(RefreshState::default()),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock_state().in_flight
    }

    pub fn waiter_count(&self) -> usize {
        self.lock_state().waiters.len()
    }

    /// Returns a freshly issued access token, refreshing at most once no
    /// matter how many callers ask concurrently.
    pub async fn ensure_fresh_credential(&self) -> Outcome {
        match self.claim()? {
            Role::Waiter(receiver) => self.wait(receiver).await,
            Role::Driver(refresh_token) => self.drive(&refresh_token).await,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn claim(&self) -> Result<Role, RefreshError> {
        let mut state = self.lock_state();
        if state.in_flight {
            let (sender, receiver) = oneshot::channel();
            state.waiters.push(sender);
            debug!(waiters = state.waiters.len(), "refresh in flight; waiting for outcome");
            return Ok(Role::Waiter(receiver));
        }
        let refresh_token = self
            .store
            .refresh_token()?
            .filter(|token| !token.is_empty())
            .ok_or(RefreshError::MissingRefreshToken)?;
        state.in_flight = true;
        Ok(Role::Driver(refresh_token))
    }

    async fn wait(&self, receiver: oneshot::Receiver<Outcome>) -> Outcome {
        let received = match self.settings.wait_timeout {
            Some(limit) => match tokio::time::timeout(limit, receiver).await {
                Ok(received) => received,
                Err(_) => {
                    warn!(
                        timeout_ms = limit.as_millis(),
                        "gave up waiting for in-flight refresh"
                    );
                    return Err(RefreshError::TimedOut);
                }
            },
            None => receiver.await,
        };
        received.unwrap_or_else(|_| Err(RefreshError::Abandoned))
    }

    async fn drive(&self, refresh_token: &str) -> Outcome {
        let mut guard = SettleOnDrop {
            coordinator: self,
            armed: true,
        };

        info!(refresh_path = %self.settings.refresh_path, "refreshing access token");
        let outcome = match self.exchange(refresh_token).await {
            Ok(pair) => self
                .store
                .replace_credentials(&pair)
                .map(|()| pair.access_token)
                .map_err(RefreshError::from),
            Err(err) => Err(err),
        };

        match &outcome {
            Ok(_) => info!("access token refreshed"),
            Err(err) => {
                warn!(error = %err, "access token refresh failed; clearing stored credentials");
                if let Err(clear_err) = self.store.clear_credentials() {
                    warn!(error = %clear_err, "failed to clear stored credentials");
                }
            }
        }

        guard.armed = false;
        self.settle(&outcome);
        outcome
    }

    async fn exchange(&self, refresh_token: &str) -> Result<CredentialPair, RefreshError> {
        let payload = serde_json::to_value(RefreshRequest { refresh_token })
            .map_err(|err| RefreshError::InvalidResponse(err.to_string()))?;
        let request = RequestDescriptor::post(self.settings.refresh_path.as_str()).with_json(payload);

        let response = self.transport.send(&request).await.map_err(|err| match err.status {
            Some(status) => RefreshError::Rejected {
                status,
                body: err.body.unwrap_or_default(),
            },
            None => RefreshError::Transport(err.message),
        })?;

        let pair: CredentialPair = serde_json::from_str(&response.body)
            .map_err(|err| RefreshError::InvalidResponse(err.to_string()))?;
        if pair.access_token.is_empty() {
            return Err(RefreshError::InvalidResponse(
                "empty access_token".to_string(),
            ));
        }
        Ok(pair)
    }

    fn settle(&self, outcome: &Outcome) {
        let waiters = {
            let mut state = self.lock_state();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        if !waiters.is_empty() {
            debug!(waiters = waiters.len(), ok = outcome.is_ok(), "releasing refresh waiters");
        }
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Releases waiters and the in-flight flag if the driving future is dropped
/// before the exchange settles.
struct SettleOnDrop<'a> {
    coordinator: &'a RefreshCoordinator,
    armed: bool,
}

impl Drop for SettleOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("refresh driver dropped before completion");
            self.coordinator.settle(&Err(RefreshError::Abandoned));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HttpResponse, TransportError};
    use async_trait::async_trait;
    use renew_keystore::{MemoryStore, ACCESS_TOKEN, REFRESH_TOKEN};
    use reqwest::StatusCode;

    struct Unreachable;

    #[async_trait]
    impl Transport for Unreachable {
        async fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse, TransportError> {
            Err(TransportError::connection(request, "connection refused"))
        }
    }

    struct Issues(&'static str);

    #[async_trait]
    impl Transport for Issues {
        async fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse, TransportError> {
            assert_eq!(request.url, "/auth/refresh");
            assert_eq!(request.authorization(), None);
            Ok(HttpResponse {
                status: StatusCode::OK,
                headers: Default::default(),
                body: self.0.to_string(),
            })
        }
    }

    fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .replace_credentials(&CredentialPair::new("access1", "refresh1"))
            .expect("seed");
        store
    }

    #[tokio::test]
    async fn missing_refresh_token_never_claims_the_flight() {
        let store = Arc::new(MemoryStore::new());
        store.set(ACCESS_TOKEN, "access1").expect("seed");
        let coordinator =
            RefreshCoordinator::new(Arc::new(Unreachable), store, RefreshSettings::default());
        let err = coordinator
            .ensure_fresh_credential()
            .await
            .expect_err("no refresh token");
        assert_eq!(err, RefreshError::MissingRefreshToken);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn connection_failure_clears_credentials_and_unlocks() {
        let store = seeded_store();
        let coordinator = RefreshCoordinator::new(
            Arc::new(Unreachable),
            store.clone(),
            RefreshSettings::default(),
        );
        let err = coordinator
            .ensure_fresh_credential()
            .await
            .expect_err("unreachable");
        assert!(matches!(err, RefreshError::Transport(_)));
        assert!(!coordinator.is_refreshing());
        assert_eq!(store.get(ACCESS_TOKEN).expect("get"), None);
        assert_eq!(store.get(REFRESH_TOKEN).expect("get"), None);
    }

    #[tokio::test]
    async fn successful_exchange_replaces_both_tokens() {
        let store = seeded_store();
        let coordinator = RefreshCoordinator::new(
            Arc::new(Issues(r#"{"access_token":"access2","refresh_token":"refresh2"}"#)),
            store.clone(),
            RefreshSettings::default(),
        );
        let token = coordinator.ensure_fresh_credential().await.expect("refresh");
        assert_eq!(token, "access2");
        assert_eq!(
            store.credentials().expect("credentials"),
            Some(CredentialPair::new("access2", "refresh2"))
        );
    }

    #[tokio::test]
    async fn malformed_response_is_a_refresh_failure() {
        let store = seeded_store();
        let coordinator = RefreshCoordinator::new(
            Arc::new(Issues(r#"{"access_token":""}"#)),
            store.clone(),
            RefreshSettings::default(),
        );
        let err = coordinator
            .ensure_fresh_credential()
            .await
            .expect_err("malformed");
        assert!(matches!(err, RefreshError::InvalidResponse(_)));
        assert_eq!(store.credentials().expect("credentials"), None);
    }
}
