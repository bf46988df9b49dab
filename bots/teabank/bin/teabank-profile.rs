use anyhow::Result;
use clap::Parser;
use core_logic::{is_transient_error, setup_logger, BotRunner};
use dotenv::dotenv;
use teabank_bot::cli::{bootstrap, Args};
use teabank_bot::ProfileBot;
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();
    let _guard = setup_logger("teabank-profile", args.verbose);

    let ctx = bootstrap(&args)?;
    let mut bot = ProfileBot::new(ctx.runner, ctx.session, ctx.waiter, &ctx.config);

    if let Err(e) = BotRunner::run(&mut bot).await {
        if is_transient_error(&e) {
            error!("The service did not answer in time. Try again in a few minutes.");
        } else {
            error!("The service rejected the session. Open the mini app again for a fresh link.");
        }
        return Err(e);
    }
    Ok(())
}
