use std::sync::Arc;

use renew_keystore::CredentialStore;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::{
    authorize, ClientConfig, ClientError, HttpResponse, RefreshCoordinator, ReqwestTransport,
    RequestDescriptor, Transport, TransportError,
};

/// HTTP client that attaches the stored bearer token and transparently
/// recovers from one expired-credential failure per request.
///
/// Clones share the transport, the store and the refresh coordinator.
/// Separately constructed clients never share refresh state.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    coordinator: RefreshCoordinator,
    unauthenticated_status: StatusCode,
}

impl AuthClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        config: &ClientConfig,
    ) -> Result<Self, ClientError> {
        let unauthenticated_status = StatusCode::from_u16(config.unauthenticated_status)
            .map_err(|err| ClientError::Config(format!("unauthenticated_status: {err}")))?;
        let coordinator =
            RefreshCoordinator::new(transport.clone(), store.clone(), config.refresh_settings());
        Ok(Self {
            inner: Arc::new(Inner {
                transport,
                store,
                coordinator,
                unauthenticated_status,
            }),
        })
    }

    pub fn from_config(
        config: &ClientConfig,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::from_config(config)?;
        Self::new(Arc::new(transport), store, config)
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.inner.coordinator
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.store
    }

    /// Sends `request` with the current access token attached.
    ///
    /// A failure with the unauthenticated status on a request that has not
    /// been retried yet triggers one shared refresh and one resubmission.
    /// The resubmission's result is returned as-is.
    pub async fn request(&self, mut request: RequestDescriptor) -> Result<HttpResponse, ClientError> {
        let access_token = self.inner.store.access_token()?;
        authorize(&mut request, access_token.as_deref())?;
        match self.inner.transport.send(&request).await {
            Ok(response) => Ok(response),
            Err(failure) => self.recover(request, failure).await,
        }
    }

    async fn recover(
        &self,
        mut request: RequestDescriptor,
        failure: TransportError,
    ) -> Result<HttpResponse, ClientError> {
        if failure.status != Some(self.inner.unauthenticated_status) || request.retried {
            return Err(failure.into());
        }

        request.retried = true;
        info!(
            method = %request.method,
            url = %request.url,
            "request unauthenticated; refreshing credentials"
        );
        let access_token = self
            .inner
            .coordinator
            .ensure_fresh_credential()
            .await
            .map_err(ClientError::RefreshFailed)?;

        authorize(&mut request, Some(&access_token))?;
        debug!(method = %request.method, url = %request.url, "resubmitting request");
        self.inner
            .transport
            .send(&request)
            .await
            .map_err(ClientError::from)
    }

    /// Forces one refresh exchange through the coordinator.
    pub async fn refresh_now(&self) -> Result<String, ClientError> {
        self.inner
            .coordinator
            .ensure_fresh_credential()
            .await
            .map_err(ClientError::RefreshFailed)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.request(RequestDescriptor::get(path)).await?.json()
    }

    pub async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ClientError> {
        self.request(RequestDescriptor::new(method, path).with_json(body))
            .await?
            .json()
    }
}
