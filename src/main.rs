use anyhow::Result;
use clap::Parser;
use crowdin_sync::{logging, run_with, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let env_debug = std::env::var("CROWDIN_DEBUG")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    let log = logging::init(cli.debug || env_debug);

    if let Err(e) = run_with(cli, || log.enable_debug()).await {
        eprintln!("[ERROR] {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
