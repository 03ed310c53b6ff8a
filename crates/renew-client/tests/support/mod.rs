#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use renew_client::{
    AuthClient, ClientConfig, HttpResponse, RefreshCoordinator, RequestDescriptor, Transport,
    TransportError,
};
use renew_keystore::{CredentialPair, CredentialStore, MemoryStore};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use tokio::sync::Semaphore;

pub const REFRESH_PATH: &str = "/auth/refresh";

pub fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("renew_client=debug"))
            .with_test_writer()
            .try_init();
    });
}

#[derive(Clone)]
pub enum RefreshScript {
    Issue { access: String, refresh: String },
    Reject(StatusCode),
}

#[derive(Clone)]
pub enum ProtectedScript {
    /// 200 when the bearer matches the currently valid access token, else 401.
    AcceptValid,
    /// 401 for a stale bearer, `status` once the valid token is presented.
    FailWhenValid(StatusCode),
    Always(StatusCode),
}

/// In-process stand-in for the API server.
///
/// The refresh endpoint can be gated so a test decides exactly when the
/// in-flight exchange completes.
pub struct ScriptedTransport {
    valid_access: Mutex<String>,
    refresh: Mutex<RefreshScript>,
    protected: Mutex<ProtectedScript>,
    gate: Option<Arc<Semaphore>>,
    calls: Mutex<Vec<RequestDescriptor>>,
}

impl ScriptedTransport {
    pub fn new(valid_access: &str, refresh: RefreshScript) -> Self {
        Self {
            valid_access: Mutex::new(valid_access.to_string()),
            refresh: Mutex::new(refresh),
            protected: Mutex::new(ProtectedScript::AcceptValid),
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn issuing(valid_access: &str, access: &str, refresh: &str) -> Self {
        Self::new(
            valid_access,
            RefreshScript::Issue {
                access: access.to_string(),
                refresh: refresh.to_string(),
            },
        )
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    pub fn with_protected(self, script: ProtectedScript) -> Self {
        *self.protected.lock().expect("protected lock") = script;
        self
    }

    pub fn set_refresh(&self, script: RefreshScript) {
        *self.refresh.lock().expect("refresh lock") = script;
    }

    pub fn open_gate(&self) {
        if let Some(gate) = self.gate.as_ref() {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn calls(&self) -> Vec<RequestDescriptor> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn refresh_calls(&self) -> Vec<RequestDescriptor> {
        self.calls()
            .into_iter()
            .filter(|call| call.url == REFRESH_PATH)
            .collect()
    }

    pub fn protected_calls(&self) -> Vec<RequestDescriptor> {
        self.calls()
            .into_iter()
            .filter(|call| call.url != REFRESH_PATH)
            .collect()
    }

    fn respond(status: StatusCode, body: String) -> HttpResponse {
        HttpResponse {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    async fn handle_refresh(
        &self,
        request: &RequestDescriptor,
    ) -> Result<HttpResponse, TransportError> {
        if let Some(gate) = self.gate.as_ref() {
            let _permit = gate
                .acquire()
                .await
                .map_err(|err| TransportError::connection(request, err))?;
        }
        let script = self.refresh.lock().expect("refresh lock").clone();
        match script {
            RefreshScript::Issue { access, refresh } => {
                *self.valid_access.lock().expect("access lock") = access.clone();
                let body = serde_json::json!({
                    "access_token": access,
                    "refresh_token": refresh,
                });
                Ok(Self::respond(StatusCode::OK, body.to_string()))
            }
            RefreshScript::Reject(status) => Err(TransportError::status(
                request,
                status,
                "invalid refresh token".to_string(),
            )),
        }
    }

    fn handle_protected(&self, request: &RequestDescriptor) -> Result<HttpResponse, TransportError> {
        let script = self.protected.lock().expect("protected lock").clone();
        match script {
            ProtectedScript::Always(status) if status.is_success() => {
                Ok(Self::respond(status, "{}".to_string()))
            }
            ProtectedScript::Always(status) => {
                Err(TransportError::status(request, status, "scripted".to_string()))
            }
            ProtectedScript::AcceptValid | ProtectedScript::FailWhenValid(_) => {
                let expected = format!("Bearer {}", self.valid_access.lock().expect("access lock"));
                if request.authorization() != Some(expected.as_str()) {
                    return Err(TransportError::status(
                        request,
                        StatusCode::UNAUTHORIZED,
                        r#"{"detail":"Invalid or expired token"}"#.to_string(),
                    ));
                }
                match script {
                    ProtectedScript::FailWhenValid(status) => {
                        Err(TransportError::status(request, status, "scripted".to_string()))
                    }
                    _ => Ok(Self::respond(
                        StatusCode::OK,
                        serde_json::json!({"url": request.url}).to_string(),
                    )),
                }
            }
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse, TransportError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(request.clone());
        if request.url == REFRESH_PATH {
            self.handle_refresh(request).await
        } else {
            self.handle_protected(request)
        }
    }
}

pub fn seeded_store(access: &str, refresh: &str) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .replace_credentials(&CredentialPair::new(access, refresh))
        .expect("seed credentials");
    store
}

pub fn client(transport: Arc<ScriptedTransport>, store: Arc<MemoryStore>) -> AuthClient {
    client_with_config(transport, store, &ClientConfig::default())
}

pub fn client_with_config(
    transport: Arc<ScriptedTransport>,
    store: Arc<MemoryStore>,
    config: &ClientConfig,
) -> AuthClient {
    AuthClient::new(transport, store, config).expect("client")
}

/// Polls until `count` callers are parked behind the in-flight refresh.
pub async fn wait_for_waiters(coordinator: &RefreshCoordinator, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !(coordinator.is_refreshing() && coordinator.waiter_count() >= count) {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("waiters did not queue in time");
}
