//! Shearwater CLI — answers crowd-submitted blog asks from a fixed knowledge
//! corpus using an extractive QA model in an isolated worker, with moderation
//! gating on both questions and answers.

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
