//! SiteScout CLI — bounded, time-boxed reconnaissance of a company website.
//!
//! Fetches a handful of well-known pages from a domain and prints the
//! extracted business signals as JSON.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
