pub(crate) mod args;
pub(crate) mod config;
pub(crate) mod types;

pub(crate) use config::{build_context, handle_config_command, load_config, save_config};
#[cfg(test)]
pub(crate) use config::resolve_client_config;
#[cfg(test)]
pub(crate) use types::CliContext;
pub(crate) use types::{CliConfig, CommandContext};
