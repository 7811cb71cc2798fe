use anyhow::Result;
use clap::Parser;
use ledgerline::cli::Cli;
use ledgerline::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;
    cli.run().await
}
