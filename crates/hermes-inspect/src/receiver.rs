//! Usage classification for receive sites.
//!
//! Two passes. The def-use pass walks forward from the receive through the
//! same memory-indirection patterns the sender analyzer knows and collects
//! one candidate instruction per basic block: a switch fed by the value, a
//! result unwrap, or a named handler invocation. The CFG pass then walks
//! forward from the receive's continuation and replays the candidates
//! against actual control flow, tracking whether the result wrapper has been
//! unwrapped yet. Diverging branches resolve to the most informative class.

use hermes_core::demangle;
use hermes_types::{
    ir::{BlockId, Callee, Function, InstrId, InstrKind, InstrRef, ModuleSet, ValueRef},
    CancelToken, Diagnostic, DiagnosticSink, FastHashMap, FastHashSet, MessagingNode, Usage,
    UsageType,
};
use tracing::trace;

/// Annotates every receive in place.
pub fn annotate_receivers(
    set: &ModuleSet,
    receives: &mut [MessagingNode],
    diag: &mut dyn DiagnosticSink,
    cancel: &CancelToken,
) {
    for recv in receives {
        let usage = analyze_receiver(set, recv.site, diag, cancel);
        recv.set_usage(usage);
    }
}

/// Classifies how the value received at `site` is consumed.
pub fn analyze_receiver(
    set: &ModuleSet,
    site: InstrRef,
    diag: &mut dyn DiagnosticSink,
    cancel: &CancelToken,
) -> Usage {
    let func = set.function(site.function_ref());
    let mut analysis = ReceiverAnalysis {
        func,
        cancel,
        visited: FastHashSet::default(),
        candidates: FastHashMap::default(),
    };
    analysis.collect(&ValueRef::Instr(site.instr));
    trace!(%site, candidates = analysis.candidates.len(), "collected points of interest");

    // invokes continue in their normal destination; a plain call continues
    // right where it stands
    let start = match &set.instr(site).kind {
        InstrKind::Invoke { normal, .. } => *normal,
        _ => func.block_of(site.instr),
    };

    let mut path = FastHashSet::default();
    let (class, at) = analysis.classify(start, &mut path, false, None);
    if class == UsageType::DirectUse && at.is_none() {
        diag.report(Diagnostic::UnresolvedUsage { site });
    }
    Usage::new(class, at.map(|instr| InstrRef { instr, ..site }))
}

struct ReceiverAnalysis<'a> {
    func:       &'a Function,
    cancel:     &'a CancelToken,
    visited:    FastHashSet<ValueRef>,
    /// one representative point of interest per block; first writer wins
    candidates: FastHashMap<BlockId, InstrId>,
}

impl ReceiverAnalysis<'_> {
    /// Def-use pass: chases the received value through memory and registers
    /// candidate usage sites.
    fn collect(&mut self, value: &ValueRef) {
        if !self.visited.insert(value.clone()) {
            return
        }
        let func = self.func;

        if let ValueRef::Instr(id) = value {
            match &func.instr(*id).kind {
                InstrKind::Invoke { callee, args, struct_ret, .. } => {
                    // the receive itself returns through its out-pointer
                    if *struct_ret && callee_is_recv(callee) {
                        if let Some(out) = args.first() {
                            self.collect(out);
                        }
                    }
                }
                InstrKind::Bitcast { source } => self.collect(source),
                _ => {}
            }
        }

        for &user in func.users_of(value) {
            match &func.instr(user).kind {
                InstrKind::Store { value: stored, ptr } => {
                    if ptr != value {
                        self.collect(ptr)
                    } else {
                        self.collect(stored)
                    }
                }
                InstrKind::Load { ptr } => {
                    self.collect(&ValueRef::Instr(user));
                    if ptr != value {
                        self.collect(ptr)
                    }
                }
                InstrKind::Bitcast { source } => {
                    self.collect(&ValueRef::Instr(user));
                    if source != value {
                        self.collect(source)
                    }
                }
                InstrKind::MemTransfer { dest, source } => {
                    self.collect(dest);
                    if source != value {
                        self.collect(source)
                    }
                }
                InstrKind::ElementPtr { .. } | InstrKind::ZExt { .. } => {
                    self.collect(&ValueRef::Instr(user))
                }
                InstrKind::Switch { .. } => {
                    self.candidates.entry(func.block_of(user)).or_insert(user);
                }
                InstrKind::Invoke { callee, args, struct_ret, .. } => {
                    if callee_is_unwrap(callee) {
                        self.candidates.entry(func.block_of(user)).or_insert(user);
                        if *struct_ret {
                            // chained unwraps land in the out-pointer
                            self.visited.insert(ValueRef::Instr(user));
                            if let Some(out) = args.first() {
                                self.collect(out);
                            }
                        } else {
                            self.collect(&ValueRef::Instr(user));
                        }
                    } else if callee.name().is_some() &&
                        self.visited.insert(ValueRef::Instr(user))
                    {
                        // a named function fed with the value is a possible
                        // message handler
                        self.candidates.entry(func.block_of(user)).or_insert(user);
                    }
                }
                _ => {}
            }
        }
    }

    /// CFG pass. The path set is backtracked so each branch sees its own
    /// history; the candidate map is shared across branches.
    fn classify(
        &mut self,
        block: BlockId,
        path: &mut FastHashSet<BlockId>,
        unwrapped: bool,
        last_hit: Option<InstrId>,
    ) -> (UsageType, Option<InstrId>) {
        if self.cancel.is_cancelled() || self.candidates.is_empty() || path.contains(&block) {
            return if unwrapped {
                (UsageType::UnwrappedDirectUse, last_hit)
            } else {
                (UsageType::DirectUse, None)
            }
        }
        path.insert(block);
        let func = self.func;

        let result = if let Some(next) = func.single_successor(block) {
            // the interesting blocks split control flow; fall through
            self.classify(next, path, unwrapped, last_hit)
        } else if let Some(&candidate) = self.candidates.get(&block) {
            match &func.instr(candidate).kind {
                InstrKind::Switch { .. } => {
                    if unwrapped {
                        (UsageType::UnwrappedToSwitch, Some(candidate))
                    } else {
                        // a switch before the unwrap is the unwrap check
                        // itself; its second successor is the Ok branch
                        self.candidates.remove(&block);
                        match func.instr(candidate).successors().get(1) {
                            Some(&ok) => self.classify(ok, path, true, Some(candidate)),
                            None => (UsageType::UnwrappedDirectUse, Some(candidate)),
                        }
                    }
                }
                InstrKind::Invoke { normal, .. } => {
                    if unwrapped {
                        (UsageType::UnwrappedToHandlerFunction, Some(candidate))
                    } else if invoke_is_unwrap(func, candidate) {
                        let normal = *normal;
                        self.candidates.remove(&block);
                        self.classify(normal, path, true, Some(candidate))
                    } else {
                        self.candidates.remove(&block);
                        (UsageType::DirectHandlerCall, Some(candidate))
                    }
                }
                // candidates are only ever switches or invokes
                _ => (UsageType::DirectUse, None),
            }
        } else {
            // unknown split: explore every successor, the lattice maximum wins
            let mut best = (UsageType::DirectUse, None);
            for succ in func.successors(block) {
                let sub = self.classify(succ, path, unwrapped, last_hit);
                if sub.0 >= best.0 {
                    best = sub;
                }
            }
            best
        };

        path.remove(&block);
        result
    }
}

fn callee_is_recv(callee: &Callee) -> bool {
    callee
        .name()
        .and_then(demangle)
        .is_some_and(|demangled| hermes_classifier::is_recv(&demangled))
}

fn callee_is_unwrap(callee: &Callee) -> bool {
    callee
        .name()
        .and_then(demangle)
        .is_some_and(|demangled| hermes_classifier::is_result_unwrap(&demangled))
}

fn invoke_is_unwrap(func: &Function, id: InstrId) -> bool {
    match &func.instr(id).kind {
        InstrKind::Invoke { callee, .. } => callee_is_unwrap(callee),
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use hermes_core::test_utils::{mangled, recv_symbol, unwrap_symbol, weather_fixture};
    use hermes_types::{
        ir::{
            BlockId, FunctionBuilder, InstrKind, Instruction, ModuleBuilder, ModuleId, TypeId,
        },
        MemorySink, NullSink,
    };

    use super::*;

    /// Module skeleton around a struct-returning `recv` invoke. Tests lay
    /// out the continuation blocks themselves.
    struct RecvHarness {
        mb:         ModuleBuilder,
        fb:         FunctionBuilder,
        entry:      BlockId,
        cont:       BlockId,
        unwind:     BlockId,
        res_slot:   InstrId,
        i32t:       TypeId,
        void:       TypeId,
    }

    impl RecvHarness {
        fn new() -> Self {
            let mut mb = ModuleBuilder::new("harness");
            let i32t = mb.int_type(32);
            let void = mb.void_type();
            let receiver = mb.struct_type("std::sync::mpsc::Receiver<u32>");
            let receiver_ptr = mb.pointer_to(receiver);
            let result = mb.struct_type("core::result::Result<u32, std::sync::mpsc::RecvError>");
            let result_ptr = mb.pointer_to(result);
            mb.declaration(recv_symbol());
            mb.declaration(unwrap_symbol());

            let mut fb = FunctionBuilder::new(mangled(&["harness", "run"]));
            let entry = fb.block();
            let cont = fb.block();
            let unwind = fb.block();
            let rx_slot = fb.push_kind(entry, InstrKind::Alloca, receiver_ptr);
            let res_slot = fb.push_kind(entry, InstrKind::Alloca, result_ptr);
            fb.push(
                entry,
                Instruction::new(
                    InstrKind::Invoke {
                        callee:     Callee::Direct(recv_symbol()),
                        args:       vec![ValueRef::Instr(res_slot), ValueRef::Instr(rx_slot)],
                        struct_ret: true,
                        normal:     cont,
                        unwind,
                    },
                    void,
                ),
            );
            Self { mb, fb, entry, cont, unwind, res_slot, i32t, void }
        }

        fn unwrap_invoke(&mut self, block: BlockId, normal: BlockId) -> InstrId {
            let unwind = self.unwind;
            self.fb.push(
                block,
                Instruction::new(
                    InstrKind::Invoke {
                        callee:     Callee::Direct(unwrap_symbol()),
                        args:       vec![ValueRef::Instr(self.res_slot)],
                        struct_ret: false,
                        normal,
                        unwind,
                    },
                    self.i32t,
                ),
            )
        }

        fn handler_invoke(&mut self, block: BlockId, arg: ValueRef, normal: BlockId) -> InstrId {
            let unwind = self.unwind;
            self.fb.push(
                block,
                Instruction::new(
                    InstrKind::Invoke {
                        callee:     Callee::Direct(mangled(&["harness", "handle"])),
                        args:       vec![arg],
                        struct_ret: false,
                        normal,
                        unwind,
                    },
                    self.void,
                ),
            )
        }

        fn ret(&mut self, block: BlockId) {
            let void = self.void;
            self.fb.push_kind(block, InstrKind::Ret { value: None }, void);
        }

        fn finish(mut self) -> (ModuleSet, InstrRef) {
            let void = self.void;
            self.fb.push_kind(self.unwind, InstrKind::Unreachable, void);
            let func = self.mb.function(self.fb);
            let set = ModuleSet::new(vec![self.mb.build()]);
            let recv = InstrRef {
                module:   ModuleId(0),
                function: func,
                // the recv invoke is the third instruction of the entry block
                instr:    InstrId(2),
            };
            (set, recv)
        }
    }

    fn classify(set: &ModuleSet, site: InstrRef) -> Usage {
        analyze_receiver(set, site, &mut NullSink, &CancelToken::new())
    }

    #[test]
    fn fixture_receive_unwraps_into_a_switch() {
        let fixture = weather_fixture();
        let usage = classify(&fixture.set, fixture.recv_site);
        assert_eq!(usage.class, UsageType::UnwrappedToSwitch);
        assert_eq!(usage.at, Some(fixture.switch_site));
        // the switch's debug line identifies the handling branch point
        assert_eq!(fixture.set.instr(fixture.switch_site).line(), Some(12));
    }

    #[test]
    fn unwrap_then_handler() {
        let mut h = RecvHarness::new();
        let after_unwrap = h.fb.block();
        let done = h.fb.block();
        let unwrap = h.unwrap_invoke(h.cont, after_unwrap);
        let handler = h.handler_invoke(after_unwrap, ValueRef::Instr(unwrap), done);
        h.ret(done);
        let (set, recv) = h.finish();

        let usage = classify(&set, recv);
        assert_eq!(usage.class, UsageType::UnwrappedToHandlerFunction);
        assert_eq!(usage.at.map(|r| r.instr), Some(handler));
    }

    #[test]
    fn handler_without_unwrap_is_a_direct_call() {
        let mut h = RecvHarness::new();
        let done = h.fb.block();
        let res = h.res_slot;
        let handler = h.handler_invoke(h.cont, ValueRef::Instr(res), done);
        h.ret(done);
        let (set, recv) = h.finish();

        let usage = classify(&set, recv);
        assert_eq!(usage.class, UsageType::DirectHandlerCall);
        assert_eq!(usage.at.map(|r| r.instr), Some(handler));
    }

    #[test]
    fn chained_unwrap_through_out_pointer() {
        // unwrap writes through a hidden out-pointer; the switch reads it back
        let mut h = RecvHarness::new();
        let after_unwrap = h.fb.block();
        let case0 = h.fb.block();
        let case1 = h.fb.block();
        let done = h.fb.block();

        let i32_ptr = h.mb.pointer_to(h.i32t);
        let out_slot = h.fb.push_kind(h.entry, InstrKind::Alloca, i32_ptr);
        // entry already ends with the recv invoke; rebuild order is fine
        // because block membership, not position, drives the analysis
        let unwind = h.unwind;
        h.fb.push(
            h.cont,
            Instruction::new(
                InstrKind::Invoke {
                    callee:     Callee::Direct(unwrap_symbol()),
                    args:       vec![ValueRef::Instr(out_slot), ValueRef::Instr(h.res_slot)],
                    struct_ret: true,
                    normal:     after_unwrap,
                    unwind,
                },
                h.void,
            ),
        );
        let loaded =
            h.fb.push_kind(after_unwrap, InstrKind::Load { ptr: ValueRef::Instr(out_slot) }, h.i32t);
        h.fb.push_kind(
            after_unwrap,
            InstrKind::Switch {
                selector: ValueRef::Instr(loaded),
                default:  done,
                cases:    vec![(0, case0), (1, case1)],
            },
            h.void,
        );
        h.ret(case0);
        h.ret(case1);
        h.ret(done);
        let (set, recv) = h.finish();

        let usage = classify(&set, recv);
        assert_eq!(usage.class, UsageType::UnwrappedToSwitch);
        assert!(usage.at.is_some());
    }

    #[test]
    fn no_candidates_degrades_to_direct_use() {
        let mut h = RecvHarness::new();
        h.ret(h.cont);
        let (set, recv) = h.finish();

        let mut sink = MemorySink::default();
        let usage = analyze_receiver(&set, recv, &mut sink, &CancelToken::new());
        assert_eq!(usage.class, UsageType::DirectUse);
        assert!(usage.at.is_none());
        assert!(sink.reports.iter().any(|d| matches!(d, Diagnostic::UnresolvedUsage { .. })));
    }

    #[test]
    fn diverging_branches_resolve_to_the_lattice_maximum() {
        // cont splits: the left branch just returns, the right unwraps into
        // a switch. the switch classification must win.
        let mut h = RecvHarness::new();
        let left = h.fb.block();
        let right = h.fb.block();
        let after_unwrap = h.fb.block();
        let case0 = h.fb.block();
        let done = h.fb.block();

        let flag = h.fb.push_kind(h.cont, InstrKind::Alloca, h.i32t);
        h.fb.push_kind(
            h.cont,
            InstrKind::CondBr {
                cond:      ValueRef::Instr(flag),
                then_dest: left,
                else_dest: right,
            },
            h.void,
        );
        h.ret(left);

        let unwrap = h.unwrap_invoke(right, after_unwrap);
        h.fb.push_kind(
            after_unwrap,
            InstrKind::Switch {
                selector: ValueRef::Instr(unwrap),
                default:  done,
                cases:    vec![(0, case0)],
            },
            h.void,
        );
        h.ret(case0);
        h.ret(done);
        let (set, recv) = h.finish();

        let usage = classify(&set, recv);
        assert_eq!(usage.class, UsageType::UnwrappedToSwitch);
    }

    #[test]
    fn cfg_cycles_terminate() {
        // cont -> {loop_head, exit}; loop_head -> cont. a handler candidate
        // sits in a block the walk never reaches, keeping the candidate map
        // non-empty the whole time.
        let mut h = RecvHarness::new();
        let loop_head = h.fb.block();
        let exit = h.fb.block();
        let island = h.fb.block();
        let island_done = h.fb.block();

        let flag = h.fb.push_kind(h.cont, InstrKind::Alloca, h.i32t);
        h.fb.push_kind(
            h.cont,
            InstrKind::CondBr {
                cond:      ValueRef::Instr(flag),
                then_dest: loop_head,
                else_dest: exit,
            },
            h.void,
        );
        h.fb.push_kind(loop_head, InstrKind::Br { dest: h.cont }, h.void);
        h.ret(exit);
        let res = h.res_slot;
        h.handler_invoke(island, ValueRef::Instr(res), island_done);
        h.ret(island_done);
        let (set, recv) = h.finish();

        let usage = classify(&set, recv);
        assert_eq!(usage.class, UsageType::DirectUse);
    }

    #[test]
    fn cancellation_returns_the_degraded_class() {
        let fixture = weather_fixture();
        let cancel = CancelToken::new();
        cancel.cancel();
        let usage = analyze_receiver(&fixture.set, fixture.recv_site, &mut NullSink, &cancel);
        assert_eq!(usage.class, UsageType::DirectUse);
    }

    #[test]
    fn classification_is_idempotent() {
        let fixture = weather_fixture();
        let first = classify(&fixture.set, fixture.recv_site);
        let second = classify(&fixture.set, fixture.recv_site);
        assert_eq!(first, second);
    }
}
