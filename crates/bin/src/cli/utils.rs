use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use eyre::Context;
use hermes_classifier::scan_modules;
use hermes_core::load_module_set;
use hermes_graph::{emit_message_graph, DotWriter};
use hermes_inspect::annotate_sites;
use hermes_types::{
    ir::ModuleSet, CancelToken, LogSink, ScannedSites, SitePair,
};
use tracing::info;

/// Defaults to 80% of the machine's cores.
pub fn determine_max_tasks(requested: Option<usize>) -> usize {
    requested.unwrap_or_else(|| {
        let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        (cores * 4 / 5).max(1)
    })
}

/// Loads the module set and runs discovery plus both per-site analyses.
pub fn load_and_annotate(
    path: &Path,
    cancel: &CancelToken,
) -> eyre::Result<(ModuleSet, ScannedSites)> {
    let set = load_module_set(path).wrap_err("loading modules")?;
    let mut diag = LogSink;
    let mut sites = scan_modules(&set, &mut diag);
    info!(sends = sites.sends.len(), receives = sites.receives.len(), "sites discovered");
    annotate_sites(&set, &mut sites, &mut diag, cancel);
    Ok((set, sites))
}

pub fn write_graph(set: &ModuleSet, pairs: &[SitePair<'_>], output: &Path) -> eyre::Result<()> {
    let file = File::create(output)
        .wrap_err_with(|| format!("creating graph file {}", output.display()))?;
    let mut writer = DotWriter::new(BufWriter::new(file));
    emit_message_graph(set, pairs, &mut writer).wrap_err("writing the message graph")?;
    writer.into_inner().flush().wrap_err("flushing the message graph")?;
    info!(output = %output.display(), edges = pairs.len(), "message graph written");
    Ok(())
}
