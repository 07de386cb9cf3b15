use anyhow::Result;
use clap::Parser;
use gbit_studio::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    gbit_studio::run(args).await
}
