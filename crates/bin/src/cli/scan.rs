use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use hermes_inspect::match_sites;
use hermes_types::{init_threadpools, CancelToken};
use tracing::info;

use super::utils::{determine_max_tasks, load_and_annotate, write_graph};

#[derive(Debug, Parser)]
pub struct ScanArgs {
    /// Module dump file, or a directory of `*.ir.json` dumps
    #[arg(long, short)]
    pub path:            PathBuf,
    /// Output graph file
    #[arg(long, short, default_value = "messages.dot")]
    pub output:          PathBuf,
    /// Keep channels that only carry `()` or unit-wrapping results/options
    #[arg(long, default_value = "false")]
    pub keep_unit_types: bool,
    /// Threads for the per-module scan, defaults to 80% of cores
    #[arg(long, short)]
    pub max_tasks:       Option<usize>,
}

impl ScanArgs {
    pub fn execute(self) -> eyre::Result<()> {
        init_threadpools(determine_max_tasks(self.max_tasks));
        let cancel = CancelToken::new();

        let (set, sites) = load_and_annotate(&self.path, &cancel)?;
        let pairs = match_sites(&sites.sends, &sites.receives, !self.keep_unit_types);
        info!(pairs = pairs.len(), "matching finished");

        write_graph(&set, &pairs, &self.output)?;
        println!(
            "{} {} send/receive pairs -> {}",
            "done:".green().bold(),
            pairs.len(),
            self.output.display()
        );
        Ok(())
    }
}
