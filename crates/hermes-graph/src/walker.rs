//! Interprocedural CFG exploration along a message path.
//!
//! Starting from a chosen send/receive pair the walker enters the receiver's
//! function and explores its CFG breadth-first, following every call into
//! defined, non-standard-library callees. Each send it encounters that the
//! message map knows about becomes the next edge of the path, and the walk
//! recurses into that pair's receiver. When the current pair carried a known
//! constant and its receive unwraps into a switch, only the successor the
//! constant selects is explored; the producer emits those switches with case
//! values that coincide with successor indices, an assumption this walker
//! shares with it.

use std::collections::VecDeque;

use hermes_classifier::{is_send, is_std_scope, namespace_of};
use hermes_core::demangle;
use hermes_types::{
    ir::{Callee, FunctionRef, InstrKind, InstrRef, ModuleSet},
    CancelToken, FastHashSet, MessageMap, MessagingNode, SitePair, UsageType,
};
use tracing::{debug, trace};

/// Walks the message graph starting from `start`, which becomes the first
/// element of the returned path. `override_value` substitutes the start
/// send's propagated constant (or supplies one when propagation failed).
pub fn walk_message_path<'a>(
    set: &'a ModuleSet,
    mmap: &MessageMap<'a>,
    start: SitePair<'a>,
    override_value: Option<i64>,
    cancel: &CancelToken,
) -> Vec<SitePair<'a>> {
    let mut walker = Walker {
        set,
        mmap,
        cancel,
        override_value,
        start_send: Some(start.0.site),
        visited_fns: FastHashSet::default(),
        path: vec![start],
    };
    walker.walk_function(start.1.site.function_ref(), Some(start));
    walker.path
}

/// Walks every message edge reachable from a function, with no entry-point
/// context: sends resolve through their own scope and switches are never
/// pruned.
pub fn walk_from_function<'a>(
    set: &'a ModuleSet,
    mmap: &MessageMap<'a>,
    function: FunctionRef,
    cancel: &CancelToken,
) -> Vec<SitePair<'a>> {
    let mut walker = Walker {
        set,
        mmap,
        cancel,
        override_value: None,
        start_send: None,
        visited_fns: FastHashSet::default(),
        path: Vec::new(),
    };
    walker.walk_function(function, None);
    walker.path
}

struct Walker<'a, 'b, 'c> {
    set:            &'a ModuleSet,
    mmap:           &'b MessageMap<'a>,
    cancel:         &'c CancelToken,
    override_value: Option<i64>,
    start_send:     Option<InstrRef>,
    visited_fns:    FastHashSet<FunctionRef>,
    path:           Vec<SitePair<'a>>,
}

impl<'a> Walker<'a, '_, '_> {
    fn walk_function(&mut self, fref: FunctionRef, entry: Option<SitePair<'a>>) {
        if self.cancel.is_cancelled() || !self.visited_fns.insert(fref) {
            return
        }
        let func = self.set.function(fref);
        if func.is_declaration() {
            return
        }
        trace!(function = func.display_name(), "walking");

        let mut queue = VecDeque::new();
        let mut been_there: FastHashSet<_> = FastHashSet::default();

        // resume right after the entry receive when we own it, otherwise
        // start at the top
        match entry {
            Some((_, recv)) if recv.site.function_ref() == fref => {
                match &self.set.instr(recv.site).kind {
                    InstrKind::Invoke { normal, .. } => queue.push_back(*normal),
                    _ => queue.push_back(func.block_of(recv.site.instr)),
                }
            }
            _ => {
                if let Some(entry_block) = func.entry_block() {
                    queue.push_back(entry_block);
                }
            }
        }

        while let Some(current) = queue.pop_front() {
            if self.cancel.is_cancelled() {
                return
            }
            if !been_there.insert(current) {
                continue
            }

            let mut pruned_successor = None;
            for &iid in &func.block(current).instrs {
                let instr = func.instr(iid);
                match &instr.kind {
                    InstrKind::Call { callee, .. } | InstrKind::Invoke { callee, .. } => {
                        let site = fref.instr(iid);
                        if callee_is_send(callee) {
                            self.follow_send(site, entry);
                        } else if let Some(target) = self.enterable(callee) {
                            self.walk_function(target, entry);
                        }
                    }
                    InstrKind::Switch { .. } => {
                        if let Some((send, recv)) = entry {
                            let site = fref.instr(iid);
                            let usage = recv.usage();
                            if usage.class == UsageType::UnwrappedToSwitch &&
                                usage.at == Some(site)
                            {
                                if let Some(value) = self.effective_assignment(send) {
                                    // trust the constant to index the successor
                                    // list; out-of-range falls back to exploring
                                    // everything
                                    pruned_successor = usize::try_from(value)
                                        .ok()
                                        .and_then(|idx| instr.successors().get(idx).copied());
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }

            if let Some(next) = pruned_successor {
                if !been_there.contains(&next) {
                    queue.push_back(next);
                }
            } else if let Some(terminator) = func.terminator_of(current) {
                for successor in terminator.successors() {
                    if !been_there.contains(&successor) {
                        queue.push_back(successor);
                    }
                }
            }
        }
    }

    /// Appends every known pair for this send and descends into each
    /// receiver. Multiple pairs per site are kept deliberately; a genuinely
    /// aliased type produces several candidate edges and pruning them here
    /// would hide real matches.
    fn follow_send(&mut self, site: InstrRef, entry: Option<SitePair<'a>>) {
        let mmap = self.mmap;
        let bucket_key = match entry {
            Some((_, recv)) => recv.scope.clone(),
            None => namespace_of(self.set, site),
        };
        let Some(bucket) = mmap.get(&bucket_key) else {
            trace!(%site, %bucket_key, "send outside any known scope bucket");
            return
        };
        for &(send, recv) in bucket {
            if send.site != site {
                continue
            }
            debug!(%site, carried = %send.carried_type, to = %recv.scope, "path edge");
            self.path.push((send, recv));
            self.walk_function(recv.site.function_ref(), Some((send, recv)));
        }
    }

    /// The constant driving switch pruning: the user-chosen instance for the
    /// starting send, the propagated assignment everywhere else.
    fn effective_assignment(&self, send: &MessagingNode) -> Option<i64> {
        if self.start_send == Some(send.site) {
            self.override_value.or_else(|| send.assignment())
        } else {
            send.assignment()
        }
    }

    /// A callee worth descending into: direct, defined somewhere in the
    /// module set, and not a standard-library or allocator frame.
    fn enterable(&self, callee: &Callee) -> Option<FunctionRef> {
        let name = callee.name()?;
        if let Some(demangled) = demangle(name) {
            if is_std_scope(&demangled) {
                return None
            }
        }
        self.set.resolve(name)
    }
}

fn callee_is_send(callee: &Callee) -> bool {
    callee.name().and_then(demangle).is_some_and(|demangled| is_send(&demangled))
}
