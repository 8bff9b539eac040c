use clap::Parser;
use quiktrade::cli::{self, Cli};
use quiktrade::AppConfig;

mod main_runtime;

use main_runtime::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config_dir)?;
    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("config: {error}");
        }
        anyhow::bail!("invalid configuration ({} problems)", errors.len());
    }

    init_logging(&config.logging);

    cli::runtime::run(cli, config).await
}
