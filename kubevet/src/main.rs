use std::process;

use anyhow::Result;
use clap::Parser;
use kubevet::Cli;

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  kubevet::init_tracing(&cli.verbose);

  let success = kubevet::run(&cli).await?;
  if !success {
    process::exit(1);
  }

  Ok(())
}
