use clap::Args;

#[derive(Args)]
pub struct RequestArgs {
    #[arg(help = "HTTP method (GET, POST, PUT, PATCH, DELETE)")]
    pub method: String,
    #[arg(help = "Path relative to the base URL, or an absolute URL")]
    pub path: String,
    #[arg(long, short = 'd', help = "JSON request body")]
    pub data: Option<String>,
    #[arg(long = "header", short = 'H', help = "Extra header as 'Name: value' (repeatable)")]
    pub headers: Vec<String>,
}
