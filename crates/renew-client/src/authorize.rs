use reqwest::header::{HeaderValue, AUTHORIZATION};

use crate::{ClientError, RequestDescriptor};

/// Attaches `Authorization: Bearer <token>` when an access token is present.
///
/// With no token (or an empty one) the headers are left untouched, so an
/// anonymous request goes out exactly as built.
pub fn authorize(
    request: &mut RequestDescriptor,
    access_token: Option<&str>,
) -> Result<(), ClientError> {
    let Some(token) = access_token.filter(|token| !token.is_empty()) else {
        return Ok(());
    };
    let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
        ClientError::InvalidCredential("access token is not a valid header value".to_string())
    })?;
    value.set_sensitive(true);
    request.headers.insert(AUTHORIZATION, value);
    Ok(())
}
