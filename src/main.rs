// Allow common clippy pedantic lints
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]

//! pagewise CLI
//!
//! Command-line interface over the provider clients

use clap::Parser;
use pagewise::cli::{Cli, Runner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let runner = Runner::new(Cli::parse());
    let settings = runner.settings()?;
    let level = runner.log_level(&settings);

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    runner.run(&settings).await?;
    Ok(())
}
