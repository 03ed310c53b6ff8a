use clap::{ArgAction, Parser, Subcommand};

pub use crate::modules::auth::args::*;
pub use crate::modules::requests::args::*;
pub use crate::modules::system::args::*;

#[derive(Parser)]
#[command(name = "renew")]
#[command(about = "Authenticated HTTP client with transparent token refresh")]
pub struct Cli {
    #[arg(long, env = "RENEW_ADDR", help = "API base URL (e.g. https://host/api/v1)")]
    pub addr: Option<String>,
    #[arg(long)]
    pub context: Option<String>,
    #[arg(long, env = "RENEW_STORE", value_enum, help = "Where credentials are kept")]
    pub store: Option<StoreKind>,
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
    #[arg(long, help = "Allow http:// and invalid TLS certificates")]
    pub insecure: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    Config(ConfigArgs),
    #[command(about = "Manage stored access/refresh tokens")]
    Tokens(TokensArgs),
    #[command(about = "Exchange the stored refresh token for a new pair")]
    Refresh,
    #[command(about = "Send an authenticated request and print the response body")]
    Request(RequestArgs),
}
