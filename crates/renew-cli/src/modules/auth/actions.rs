use renew_client::{AuthClient, ClientError};
use renew_keystore::{CredentialStore, ACCESS_TOKEN, REFRESH_TOKEN};
use tracing::info;

use crate::cli_args::*;

pub(crate) fn handle_tokens_command(
    args: TokensArgs,
    context_name: &str,
    store: &dyn CredentialStore,
) -> anyhow::Result<()> {
    match args.command {
        TokensCommand::Set(args) => {
            let access_token = args.access_token.filter(|token| !token.trim().is_empty());
            let refresh_token = args.refresh_token.filter(|token| !token.trim().is_empty());
            if access_token.is_none() && refresh_token.is_none() {
                anyhow::bail!("provide --access-token, --refresh-token, or both");
            }
            if let Some(token) = refresh_token {
                store.set(REFRESH_TOKEN, token.trim())?;
            }
            if let Some(token) = access_token {
                store.set(ACCESS_TOKEN, token.trim())?;
            }
            info!(context = context_name, "tokens stored");
        }
        TokensCommand::Show(args) => {
            let (name, token) = if args.refresh {
                ("refresh token", store.refresh_token()?)
            } else {
                ("access token", store.access_token()?)
            };
            let token =
                token.ok_or_else(|| anyhow::anyhow!("{name} not stored for {context_name}"))?;
            println!("{token}");
        }
        TokensCommand::Clear => {
            store.clear_credentials()?;
            info!(context = context_name, "tokens cleared");
        }
    }
    Ok(())
}

pub(crate) async fn handle_refresh(client: &AuthClient) -> anyhow::Result<()> {
    client.refresh_now().await.map_err(session_error)?;
    println!("Refreshed");
    Ok(())
}

/// Turns a failed refresh into an actionable message; other errors pass
/// through unchanged.
pub(crate) fn session_error(err: ClientError) -> anyhow::Error {
    match err {
        ClientError::RefreshFailed(cause) => anyhow::anyhow!(
            "session expired ({cause}); store new credentials with `renew tokens set`"
        ),
        other => other.into(),
    }
}
