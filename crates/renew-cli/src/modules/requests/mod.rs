mod actions;
pub(crate) mod args;

pub(crate) use actions::handle_request;
#[cfg(test)]
pub(crate) use actions::{build_request, parse_header};
