use anyhow::Result;
use clap::Parser;

use notehub_bootstrap::{init_tracing, run_context, AppContext};
use notehub_infrastructure::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "notehub")]
#[command(about = "NoteHub real-time notification server", long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(config) = args.config {
        std::env::set_var("NOTEHUB_CONFIG", config);
    }

    let config = AppConfig::load().await?;
    let _guard = init_tracing(&config);

    run_context(AppContext::from_config(config)).await
}
