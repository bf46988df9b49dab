use anyhow::Result;
use clap::Parser;
use core_logic::{setup_logger, BotRunner};
use dotenv::dotenv;
use teabank_bot::cli::{bootstrap, Args};
use teabank_bot::TasksBot;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();
    let _guard = setup_logger("teabank-tasks", args.verbose);

    let ctx = bootstrap(&args)?;
    let mut bot = TasksBot::new(ctx.runner, ctx.session, ctx.waiter, &ctx.config);

    BotRunner::run(&mut bot).await?;
    Ok(())
}
