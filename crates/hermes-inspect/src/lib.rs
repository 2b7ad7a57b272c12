//! Per-site analyses over the scanner's output.
//!
//! The sender analyzer chases a send's payload backwards through memory
//! indirection to a constant store; the receiver analyzer classifies how a
//! received value is consumed; the matcher pairs annotated sends with
//! receives by carried type. Each analysis degrades instead of failing: a
//! site it cannot explain keeps its default annotation and the pipeline
//! moves on.

use hermes_types::{CancelToken, DiagnosticSink, ScannedSites};

pub mod matcher;
pub use matcher::match_sites;
pub mod receiver;
pub use receiver::{analyze_receiver, annotate_receivers};
pub mod sender;
pub use sender::{analyze_sender, annotate_senders};

/// Runs both per-site analyses in place. This is the single point where site
/// records are mutated; afterwards the set is ready for the matcher.
pub fn annotate_sites(
    set: &hermes_types::ir::ModuleSet,
    sites: &mut ScannedSites,
    diag: &mut dyn DiagnosticSink,
    cancel: &CancelToken,
) {
    annotate_senders(set, &mut sites.sends, diag);
    annotate_receivers(set, &mut sites.receives, diag, cancel);
}
