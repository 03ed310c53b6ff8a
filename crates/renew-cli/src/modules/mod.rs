pub(crate) mod auth;
pub(crate) mod requests;
pub(crate) mod system;
