use std::path::PathBuf;

use clap::Parser;
use keygate::{ServerOverrides, run};

#[derive(Parser)]
#[command(name = "keygate", about = "License key entitlement server")]
struct Cli {
    /// Path to a config.toml (default: probe config.toml, then user dirs)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind host override
    #[arg(long)]
    host: Option<String>,

    /// Bind port override
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(ServerOverrides {
        config_path: cli.config,
        host: cli.host,
        port: cli.port,
    }))
}
