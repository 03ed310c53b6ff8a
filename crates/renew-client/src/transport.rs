use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

use crate::{ClientConfig, ClientError, HttpResponse, RequestDescriptor};

/// A failed send. Non-2xx responses carry their status; connection-level
/// failures carry none. The originating descriptor travels with the error.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub status: Option<StatusCode>,
    pub request: Box<RequestDescriptor>,
    pub body: Option<String>,
    pub message: String,
}

impl TransportError {
    pub fn status(request: &RequestDescriptor, status: StatusCode, body: String) -> Self {
        Self {
            status: Some(status),
            message: format!("{} {} failed: {status} {body}", request.method, request.url),
            request: Box::new(request.clone()),
            body: Some(body),
        }
    }

    pub fn connection(request: &RequestDescriptor, message: impl std::fmt::Display) -> Self {
        Self {
            status: None,
            message: format!("{} {} failed: {message}", request.method, request.url),
            request: Box::new(request.clone()),
            body: None,
        }
    }
}

const INSECURE_REFUSED: &str = "refusing to use http:// without --insecure";

/// Rejects plain `http://` urls unless insecure transport was opted into.
pub fn ensure_secure_url(url: &str, allow_insecure: bool) -> Result<(), &'static str> {
    if url.starts_with("http://") && !allow_insecure {
        return Err(INSECURE_REFUSED);
    }
    Ok(())
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse, TransportError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    allow_insecure: bool,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, allow_insecure: bool) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            allow_insecure,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        ensure_secure_url(&config.base_url, config.allow_insecure)
            .map_err(|reason| ClientError::Config(reason.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .danger_accept_invalid_certs(config.allow_insecure)
            .build()
            .map_err(|err| ClientError::Config(err.to_string()))?;
        Ok(Self::new(client, config.base_url.clone(), config.allow_insecure))
    }

    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse, TransportError> {
        let url = self.resolve_url(&request.url);
        ensure_secure_url(&url, self.allow_insecure)
            .map_err(|reason| TransportError::connection(request, reason))?;

        let builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(request.headers.clone());
        let builder = if let Some(body) = request.body.as_ref() {
            builder.json(body)
        } else {
            builder
        };

        debug!(method = %request.method, url = %url, retried = request.retried, "http request");
        let start = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|err| TransportError::connection(request, err))?;
        let status = response.status();
        let headers = response.headers().clone();
        debug!(
            method = %request.method,
            url = %url,
            status = %status,
            elapsed_ms = start.elapsed().as_millis(),
            "http response"
        );
        let body = response
            .text()
            .await
            .map_err(|err| TransportError::connection(request, err))?;

        if !status.is_success() {
            return Err(TransportError::status(request, status, body));
        }
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
