// src/bin/cli.rs
use clap::Parser;
use tr_scrape::{cli, log};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = cli::Args::parse();
    let _guard = log::init(args.verbose).map_err(|e| color_eyre::eyre::eyre!(e))?;
    cli::run(args)
}
