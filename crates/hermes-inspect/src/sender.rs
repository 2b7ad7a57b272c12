//! Constant propagation for send sites.
//!
//! Starting from the payload argument of a send, a bounded def-use walk
//! follows bitcasts, loads, stores, memcpy-like transfers and
//! element-pointer arithmetic until it hits a store of an integer constant
//! that definitively feeds the payload location. A visited set breaks
//! cycles; anything the walk cannot explain leaves the assignment absent.

use hermes_types::{
    ir::{Function, InstrId, InstrKind, InstrRef, ModuleSet, ValueRef},
    Diagnostic, DiagnosticSink, FastHashSet, MessagingNode,
};
use tracing::trace;

/// Annotates every send in place. Re-running this over already annotated
/// sites recomputes the same assignments.
pub fn annotate_senders(
    set: &ModuleSet,
    sends: &mut [MessagingNode],
    diag: &mut dyn DiagnosticSink,
) {
    for send in sends {
        let assignment = analyze_sender(set, send.site, diag);
        send.set_assignment(assignment);
    }
}

/// Finds the constant flowing into the payload of the send at `site`, if a
/// single constant store definitively reaches it.
pub fn analyze_sender(
    set: &ModuleSet,
    site: InstrRef,
    diag: &mut dyn DiagnosticSink,
) -> Option<i64> {
    let func = set.function(site.function_ref());
    let payload = set.instr(site).call_args()?.last()?;
    trace!(%site, ?payload, "chasing send payload");

    // a literal payload needs no store to explain it
    if let Some(value) = payload.const_int() {
        return Some(value)
    }

    let mut search = StoreSearch { func, site, visited: FastHashSet::default(), diag };
    match search.find_store(payload) {
        Some(store) => match &func.instr(store).kind {
            InstrKind::Store { value, .. } => value.const_int(),
            _ => None,
        },
        None => {
            diag.report(Diagnostic::NoConstantStore { site });
            None
        }
    }
}

struct StoreSearch<'a, 'd> {
    func:    &'a Function,
    site:    InstrRef,
    visited: FastHashSet<ValueRef>,
    diag:    &'d mut dyn DiagnosticSink,
}

impl StoreSearch<'_, '_> {
    /// Recursive search for the relevant constant store. Returns the first
    /// hit in user-iteration order; revisits cut off immediately.
    fn find_store(&mut self, value: &ValueRef) -> Option<InstrId> {
        if !self.visited.insert(value.clone()) {
            return None
        }
        let func = self.func;

        if let ValueRef::Instr(id) = value {
            match &func.instr(*id).kind {
                // phi joins are noted but not split-explored
                InstrKind::Phi { .. } => self.diag.report(Diagnostic::PhiEncountered {
                    site: InstrRef { instr: *id, ..self.site },
                }),
                InstrKind::Bitcast { source } => {
                    if let Some(found) = self.find_store(source) {
                        return Some(found)
                    }
                }
                InstrKind::Load { ptr } => {
                    if let Some(found) = self.find_store(ptr) {
                        return Some(found)
                    }
                }
                _ => {}
            }
        }

        for &user in func.users_of(value) {
            let found = match &func.instr(user).kind {
                InstrKind::Load { ptr } => self.find_store(ptr),
                InstrKind::Store { value: stored, .. } => {
                    // done once we see a constant assignment
                    if stored.const_int().is_some() {
                        return Some(user)
                    }
                    self.find_store(stored)
                }
                InstrKind::Bitcast { source } => {
                    // the value either feeds the bitcast or falls out of it
                    if source == value {
                        self.find_store(&ValueRef::Instr(user))
                    } else {
                        self.find_store(source)
                    }
                }
                InstrKind::MemTransfer { dest, source } => {
                    // follow whichever endpoint is not ours
                    if dest == value {
                        self.find_store(source)
                    } else {
                        self.find_store(dest)
                    }
                }
                InstrKind::ElementPtr { .. } => self.find_store(&ValueRef::Instr(user)),
                // stack slots carry no information upward
                InstrKind::Alloca => None,
                _ => None,
            };
            if let Some(found) = found {
                return Some(found)
            }
        }

        None
    }
}
