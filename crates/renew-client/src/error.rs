use renew_keystore::StoreError;
use reqwest::StatusCode;
use thiserror::Error;

use crate::transport::TransportError;

/// Outcome of a failed refresh exchange.
///
/// Cloned once per waiter, so every caller parked on the same refresh sees
/// the identical failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("refresh token missing; sign in again")]
    MissingRefreshToken,
    #[error("refresh rejected: {status} {body}")]
    Rejected { status: StatusCode, body: String },
    #[error("refresh request failed: {0}")]
    Transport(String),
    #[error("refresh response invalid: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("refresh abandoned before completion")]
    Abandoned,
    #[error("timed out waiting for in-flight refresh")]
    TimedOut,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("credential refresh failed: {0}")]
    RefreshFailed(#[source] RefreshError),
    #[error("invalid access token: {0}")]
    InvalidCredential(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("invalid client configuration: {0}")]
    Config(String),
}

/// Coarse classification used to compare outcomes across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Http(StatusCode),
    Connection,
    RefreshFailed,
    Other,
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Transport(err) => err.status,
            Self::RefreshFailed(RefreshError::Rejected { status, .. }) => Some(*status),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(err) => match err.status {
                Some(status) => ErrorKind::Http(status),
                None => ErrorKind::Connection,
            },
            Self::RefreshFailed(_) => ErrorKind::RefreshFailed,
            _ => ErrorKind::Other,
        }
    }
}
