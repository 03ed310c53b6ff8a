use crate::cli_args::*;
use crate::modules::auth::{handle_refresh, handle_tokens_command};
use crate::modules::requests::handle_request;
use crate::modules::system::CommandContext;

pub(crate) async fn handle_command(command: Command, ctx: &CommandContext) -> anyhow::Result<()> {
    match command {
        Command::Tokens(args) => {
            handle_tokens_command(args, &ctx.context_name, ctx.client.store().as_ref())?
        },
        Command::Refresh => handle_refresh(&ctx.client).await?,
        Command::Request(args) => handle_request(args, ctx).await?,
        Command::Config(_) => {
            unreachable!()
        }
    }

    Ok(())
}
