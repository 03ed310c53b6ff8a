#![deny(clippy::unwrap_used)]

pub mod authorize;
pub mod client;
pub mod config;
pub mod error;
pub mod refresh;
pub mod request;
pub mod transport;

pub use crate::authorize::authorize;
pub use crate::client::AuthClient;
pub use crate::config::{apply_env_overrides, apply_overrides, load_config, ClientConfig};
pub use crate::error::{ClientError, ErrorKind, RefreshError};
pub use crate::refresh::{RefreshCoordinator, RefreshSettings};
pub use crate::request::{HttpResponse, RequestDescriptor};
pub use crate::transport::{ReqwestTransport, Transport, TransportError};
