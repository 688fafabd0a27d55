use anyhow::Result;
use clap::Parser;
use escola_chat::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    escola_chat::run(args).await
}
