use clap::{Parser, Subcommand};

mod guided;
mod scan;
mod utils;

use crate::banner;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "hermes", version = "0.1.0")]
#[command(propagate_version = true)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a module set and emit the full message graph
    #[command(name = "scan")]
    Scan(scan::ScanArgs),
    /// Walk one message path from an interactively chosen send
    #[command(name = "guided")]
    Guided(guided::GuidedArgs),
}

impl Args {
    pub fn run(self) -> eyre::Result<()> {
        banner::print_banner();
        match self.command {
            Commands::Scan(cmd) => cmd.execute(),
            Commands::Guided(cmd) => cmd.execute(),
        }
    }
}
