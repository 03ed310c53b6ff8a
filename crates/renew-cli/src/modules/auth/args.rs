use clap::{Args, Subcommand};

#[derive(Args)]
pub struct TokensArgs {
    #[command(subcommand)]
    pub command: TokensCommand,
}

#[derive(Subcommand)]
pub enum TokensCommand {
    #[command(about = "Store an access token, a refresh token, or both")]
    Set(TokensSetArgs),
    #[command(about = "Print a stored token")]
    Show(TokensShowArgs),
    #[command(about = "Remove both stored tokens")]
    Clear,
}

#[derive(Args)]
pub struct TokensSetArgs {
    #[arg(long, env = "RENEW_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,
    #[arg(long, env = "RENEW_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,
}

#[derive(Args)]
pub struct TokensShowArgs {
    #[arg(long, help = "Print the refresh token instead of the access token")]
    pub refresh: bool,
}
