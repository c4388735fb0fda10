use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    match args.get_command() {
        cli::Commands::Serve => {
            commands::serve::execute(&args.config).await?;
        }
        cli::Commands::Seed { count, days_back } => {
            commands::seed::execute(&args.config, count, days_back).await?;
        }
        cli::Commands::Version => {
            println!("Logs Dashboard API v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
