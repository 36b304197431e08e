//! edumeta CLI — offline meta-data extraction for simulated learning
//! environments.
//!
//! Converts per-timestep interaction datasets into a knowledge learning
//! order, an item catalog with difficulty estimates, and a
//! knowledge-to-item index.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
