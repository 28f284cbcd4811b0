use anyhow::Result;
use clap::Parser;
use judgebench::cli::{self, Cli};
use judgebench::Config;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    let config = Config::load_or_init()?;
    cli::run(cli, config).await
}
