use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use remote_edit::cli::Cli;

fn main() -> Result<()> {
    // Load .env early; ignore if missing.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = remote_edit::load_settings(&cli);

    // `debug = true` in settings turns on debug logs unless RUST_LOG says otherwise.
    let debug = settings.as_ref().is_ok_and(|s| s.debug);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug { "remote_edit=debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .with_target(false)
        .init();

    remote_edit::run(cli, settings?)
}
