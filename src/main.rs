use anyhow::Result;
use clap::Parser;
use echocheck::{cli, launch};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    launch(args).await
}
