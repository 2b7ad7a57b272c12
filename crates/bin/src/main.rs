use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::{
    filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry,
};

mod banner;
mod cli;
mod prompt;

fn main() -> ExitCode {
    let filter = EnvFilter::builder().with_default_directive(Level::INFO.into()).from_env_lossy();
    Registry::default().with(tracing_subscriber::fmt::layer().with_filter(filter)).init();

    let args = cli::Args::parse();
    match args.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:?}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
