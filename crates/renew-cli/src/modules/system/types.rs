use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use renew_client::AuthClient;

use super::args::StoreKind;

#[derive(Serialize, Deserialize, Default)]
pub struct CliConfig {
    #[serde(default)]
    pub current_context: Option<String>,
    #[serde(default)]
    pub contexts: HashMap<String, CliContext>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct CliContext {
    pub addr: String,
    #[serde(default)]
    pub refresh_path: Option<String>,
    #[serde(default)]
    pub store: Option<StoreKind>,
}

pub struct CommandContext {
    pub context_name: String,
    pub client: AuthClient,
}
