use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use hermes_graph::{build_message_map, run_guided, GuidedConfig};
use hermes_inspect::match_sites;
use hermes_types::{init_threadpools, CancelToken};

use super::utils::{determine_max_tasks, load_and_annotate, write_graph};
use crate::prompt::StdinPrompter;

#[derive(Debug, Parser)]
pub struct GuidedArgs {
    /// Module dump file, or a directory of `*.ir.json` dumps
    #[arg(long, short)]
    pub path:               PathBuf,
    /// Output graph file for the walked path
    #[arg(long, short, default_value = "path.dot")]
    pub output:             PathBuf,
    /// Starting scope; exact key or unique substring skips the prompt
    #[arg(long, short)]
    pub scope:              Option<String>,
    /// Starting send site by source line; skips the prompt
    #[arg(long, short)]
    pub line:               Option<u32>,
    /// Ask for a message instance even when a constant was propagated
    #[arg(long, default_value = "false")]
    pub ignore_known_value: bool,
    /// Keep channels that only carry `()` or unit-wrapping results/options
    #[arg(long, default_value = "false")]
    pub keep_unit_types:    bool,
    /// Threads for the per-module scan, defaults to 80% of cores
    #[arg(long, short)]
    pub max_tasks:          Option<usize>,
}

impl GuidedArgs {
    pub fn execute(self) -> eyre::Result<()> {
        init_threadpools(determine_max_tasks(self.max_tasks));
        let cancel = CancelToken::new();

        let (set, sites) = load_and_annotate(&self.path, &cancel)?;
        let pairs = match_sites(&sites.sends, &sites.receives, !self.keep_unit_types);
        let mmap = build_message_map(&pairs);

        let config = GuidedConfig {
            scope:              self.scope,
            line:               self.line,
            ignore_known_value: self.ignore_known_value,
        };
        let mut prompter = StdinPrompter;
        let path = run_guided(&set, &mmap, &config, &mut prompter, &cancel)?;

        println!("\n{}", "discovered path:".bold());
        for (send, recv) in &path {
            println!(
                "  {} {} {} [{}{}]",
                send.scope,
                "->".cyan(),
                recv.scope,
                send.carried_type,
                send.assignment().map(|v| format!(" = {v}")).unwrap_or_default(),
            );
        }

        write_graph(&set, &path, &self.output)?;
        println!(
            "{} {} edges -> {}",
            "done:".green().bold(),
            path.len(),
            self.output.display()
        );
        Ok(())
    }
}
