//! Per-module traversal that emits one record per channel call site.

use hermes_core::demangle;
use hermes_types::{
    ir::{Function, InstrId, InstrRef, Module, ModuleId, ModuleSet},
    Diagnostic, DiagnosticSink, MemorySink, MessagingNode, ScannedSites, SiteKind,
};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::{
    scope::namespace_of,
    symbols::{is_recv, is_select_struct, is_send, received_type, sent_type},
};

/// Scans every module for send/receive call sites.
///
/// Modules are scanned in parallel (per-module results are independent) and
/// concatenated in module order, so output is a pure function of the module
/// set. The scanner never touches the IR.
pub fn scan_modules(set: &ModuleSet, diag: &mut dyn DiagnosticSink) -> ScannedSites {
    let mut per_module: Vec<(ScannedSites, MemorySink)> = (0..set.modules().len())
        .into_par_iter()
        .map(|idx| {
            let mut sink = MemorySink::default();
            let sites = scan_module(set, ModuleId(idx as u32), &mut sink);
            (sites, sink)
        })
        .collect();

    let mut out = ScannedSites::default();
    for (sites, mut sink) in per_module.drain(..) {
        out.sends.extend(sites.sends);
        out.receives.extend(sites.receives);
        sink.drain_into(diag);
    }
    debug!(sends = out.sends.len(), receives = out.receives.len(), "scan finished");
    out
}

fn scan_module(set: &ModuleSet, module_id: ModuleId, diag: &mut dyn DiagnosticSink) -> ScannedSites {
    let module = set.module(module_id);
    trace!(module = %module.name, "scanning module");

    let mut sites = ScannedSites::default();
    for (fidx, func) in module.functions.iter().enumerate() {
        for block in &func.blocks {
            for &iid in &block.instrs {
                if !func.instr(iid).is_call() {
                    continue
                }
                let site = InstrRef {
                    module:   module_id,
                    function: hermes_types::ir::FunctionId(fidx as u32),
                    instr:    iid,
                };
                if let Some(node) = classify_site(set, module, func, site, iid, diag) {
                    match node.kind() {
                        SiteKind::Send => sites.sends.push(node),
                        SiteKind::Receive => sites.receives.push(node),
                    }
                }
            }
        }
    }
    sites
}

/// Classifies one call instruction, extracting the carried type from the
/// channel-handle argument's pointee struct.
fn classify_site(
    set: &ModuleSet,
    module: &Module,
    func: &Function,
    site: InstrRef,
    iid: InstrId,
    diag: &mut dyn DiagnosticSink,
) -> Option<MessagingNode> {
    let instr = func.instr(iid);
    let symbol = instr.callee()?.name()?;
    let Some(demangled) = demangle(symbol) else {
        diag.report(Diagnostic::DemangleFailed { symbol: symbol.to_string() });
        return None
    };

    let kind = if is_send(&demangled) {
        SiteKind::Send
    } else if is_recv(&demangled) {
        SiteKind::Receive
    } else {
        return None
    };

    let args = instr.call_args()?;
    // a struct-returning channel call passes its out-pointer first, pushing
    // the handle to argument 1
    let handle_index = usize::from(instr.struct_ret());
    let struct_name = module.pointee_struct_name(func, args.get(handle_index)?)?;

    let carried = match kind {
        SiteKind::Send => sent_type(struct_name),
        SiteKind::Receive if is_select_struct(struct_name) => {
            // multi-way select: the payload type hides in the final argument
            args.last().and_then(|arg| module.pointee_struct_name(func, arg)).and_then(received_type)
        }
        SiteKind::Receive => received_type(struct_name),
    };
    let Some(carried) = carried else {
        diag.report(Diagnostic::UnknownChannelStruct {
            site,
            struct_name: struct_name.to_string(),
        });
        return None
    };

    let scope = namespace_of(set, site);
    trace!(%site, %kind, carried, %scope, "channel site");
    Some(match kind {
        SiteKind::Send => MessagingNode::send(site, carried.to_string(), scope),
        SiteKind::Receive => MessagingNode::receive(site, carried.to_string(), scope),
    })
}
