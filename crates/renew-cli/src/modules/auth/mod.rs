mod actions;
pub(crate) mod args;

pub(crate) use actions::{handle_refresh, handle_tokens_command, session_error};
