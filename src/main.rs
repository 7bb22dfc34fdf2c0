use anyhow::Result;
use chainroute::cli::{run_cli, Cli};
use chainroute::logging::{init_logging, LogConfig, LogFormat};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env();
    if let Some(level) = &cli.log_level {
        log_config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        log_config.format = LogFormat::parse(format);
    }
    init_logging(&log_config)?;

    run_cli(cli).await
}
