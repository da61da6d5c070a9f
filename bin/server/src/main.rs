use std::path::PathBuf;

use clap::Parser;
use welcome_server::configuration::{get_configuration, DEFAULT_CONFIG_FILE};
use welcome_server::telemetry::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "sig-welcome", about = "Welcomes newcomers and points them at the owning SIG")]
struct Opt {
    /// Path to the YAML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();

    let settings = get_configuration(&opt.config)?;
    init_tracing(&settings.log.level);

    welcome_server::run(settings).await
}
