use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use renew_client::{apply_env_overrides, AuthClient, ClientConfig};
use renew_keystore::{CredentialStore, FileStore, KeyringStore};

use super::args::StoreKind;
use super::types::{CliConfig, CliContext, CommandContext};
use crate::cli_args::{ConfigArgs, ConfigCommand};
use crate::{CLIENT_CONFIG_ENV, DEFAULT_CONTEXT};

pub(crate) fn handle_config_command(
    args: ConfigArgs,
    config: &mut CliConfig,
) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::SetContext(args) => {
            let entry = config
                .contexts
                .entry(args.name.clone())
                .or_insert_with(|| CliContext {
                    addr: renew_client::config::DEFAULT_BASE_URL.to_string(),
                    refresh_path: None,
                    store: None,
                });
            if let Some(addr) = args.addr {
                entry.addr = addr;
            }
            if let Some(refresh_path) = args.refresh_path {
                entry.refresh_path = Some(refresh_path);
            }
            if let Some(store) = args.store {
                entry.store = Some(store);
            }
            config.current_context = Some(args.name);
        }
        ConfigCommand::UseContext(args) => {
            if !config.contexts.contains_key(&args.name) {
                anyhow::bail!("context not found: {}", args.name);
            }
            config.current_context = Some(args.name);
        }
        ConfigCommand::CurrentContext => {
            if let Some(current) = config.current_context.clone() {
                println!("{current}");
            }
        }
        ConfigCommand::GetContexts => {
            let mut names: Vec<_> = config.contexts.keys().cloned().collect();
            names.sort();
            for name in names {
                let marker = if config.current_context.as_ref() == Some(&name) {
                    "*"
                } else {
                    " "
                };
                println!("{marker} {name}");
            }
        }
        ConfigCommand::DeleteContext(args) => {
            if config.contexts.remove(&args.name).is_none() {
                anyhow::bail!("context not found: {}", args.name);
            }
            if config.current_context.as_deref() == Some(&args.name) {
                config.current_context = None;
            }
        }
    }
    Ok(())
}

fn renew_home() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("HOME is not set"))?;
    Ok(Path::new(&home).join(".renew"))
}

fn config_path() -> anyhow::Result<PathBuf> {
    Ok(renew_home()?.join("config.json"))
}

pub(crate) fn credentials_path(context_name: &str) -> anyhow::Result<PathBuf> {
    Ok(renew_home()?
        .join("credentials")
        .join(format!("{context_name}.json")))
}

pub(crate) fn load_config() -> anyhow::Result<CliConfig> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(CliConfig::default());
    }
    let contents = fs::read_to_string(path)?;
    let config = serde_json::from_str(&contents)?;
    Ok(config)
}

pub(crate) fn save_config(config: &CliConfig) -> anyhow::Result<()> {
    let path = config_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(config)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Layers the client config: optional file, then `RENEW_*` variables, then
/// the selected context, then command-line flags.
pub(crate) fn resolve_client_config(
    addr_arg: Option<String>,
    context: Option<&CliContext>,
    insecure: bool,
) -> ClientConfig {
    let mut client_config = match std::env::var(CLIENT_CONFIG_ENV) {
        Ok(path) if !path.trim().is_empty() => renew_client::load_config(path.trim()),
        _ => ClientConfig::default(),
    };
    apply_env_overrides(&mut client_config);
    if let Some(context) = context {
        client_config.base_url = context.addr.clone();
        if let Some(refresh_path) = &context.refresh_path {
            client_config.refresh_path = refresh_path.clone();
        }
    }
    if let Some(addr) = addr_arg {
        client_config.base_url = addr;
    }
    if insecure {
        client_config.allow_insecure = true;
    }
    client_config
}

pub(crate) fn open_store(
    kind: StoreKind,
    context_name: &str,
) -> anyhow::Result<Arc<dyn CredentialStore>> {
    let store: Arc<dyn CredentialStore> = match kind {
        StoreKind::Keyring => Arc::new(KeyringStore::new(context_name)),
        StoreKind::File => Arc::new(FileStore::new(credentials_path(context_name)?)),
    };
    Ok(store)
}

pub(crate) fn build_context(
    addr_arg: Option<String>,
    context_arg: Option<String>,
    store_arg: Option<StoreKind>,
    insecure: bool,
    config: &CliConfig,
) -> anyhow::Result<CommandContext> {
    let context_name = context_arg
        .or_else(|| config.current_context.clone())
        .unwrap_or_else(|| DEFAULT_CONTEXT.to_string());
    let context = config.contexts.get(&context_name);
    let client_config = resolve_client_config(addr_arg, context, insecure);

    let kind = store_arg
        .or_else(|| context.and_then(|ctx| ctx.store))
        .unwrap_or(StoreKind::Keyring);
    let store = open_store(kind, &context_name)?;
    let client = AuthClient::from_config(&client_config, store)?;
    Ok(CommandContext {
        context_name,
        client,
    })
}
