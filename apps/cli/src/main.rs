//! Icebreaker CLI: personalized cold-email openers from a lead's website.
//!
//! Reads leads, visits their company sites, and writes one icebreaker (or a
//! failure reason) per lead.

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
