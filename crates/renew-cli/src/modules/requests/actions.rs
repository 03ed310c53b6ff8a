use renew_client::{HttpResponse, RequestDescriptor};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Method;

use crate::cli_args::RequestArgs;
use crate::modules::auth::session_error;
use crate::modules::system::CommandContext;

pub(crate) async fn handle_request(args: RequestArgs, ctx: &CommandContext) -> anyhow::Result<()> {
    let request = build_request(args)?;
    let response = ctx.client.request(request).await.map_err(session_error)?;
    print_response(&response)
}

pub(crate) fn build_request(args: RequestArgs) -> anyhow::Result<RequestDescriptor> {
    let method = parse_method(&args.method)?;
    let mut request = RequestDescriptor::new(method, args.path);
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        request = request.with_header(name, value);
    }
    if let Some(data) = args.data {
        let body: serde_json::Value = serde_json::from_str(&data)
            .map_err(|err| anyhow::anyhow!("--data is not valid JSON: {err}"))?;
        request = request.with_json(body);
    }
    Ok(request)
}

fn parse_method(raw: &str) -> anyhow::Result<Method> {
    Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| anyhow::anyhow!("invalid HTTP method: {raw}"))
}

pub(crate) fn parse_header(raw: &str) -> anyhow::Result<(HeaderName, HeaderValue)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("header must look like 'Name: value': {raw}"))?;
    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|_| anyhow::anyhow!("invalid header name: {}", name.trim()))?;
    let value = HeaderValue::from_str(value.trim())
        .map_err(|_| anyhow::anyhow!("invalid header value for {name}"))?;
    Ok((name, value))
}

fn print_response(response: &HttpResponse) -> anyhow::Result<()> {
    if response.body.trim().is_empty() {
        return Ok(());
    }
    match serde_json::from_str::<serde_json::Value>(&response.body) {
        Ok(body) => println!("{}", serde_json::to_string_pretty(&body)?),
        Err(_) => println!("{}", response.body),
    }
    Ok(())
}
