//! Fixture modules and symbol helpers shared by the analyzer tests.
//!
//! The weather-station fixture is a two-module set: a station that sends a
//! constant `weatherstation::Weather` reading over an mpsc channel, and a
//! dispatcher that receives it, unwraps the result and branches on the
//! value. It exercises the scanner, both analyzers, the matcher and the
//! guided walker end to end.

use hermes_types::ir::{
    FunctionBuilder, FunctionId, InstrKind, InstrRef, Instruction, ModuleBuilder, ModuleId,
    ModuleSet, ValueRef,
};

pub const SENDER_SEGMENT: &str = "_$LT$std..sync..mpsc..Sender$LT$T$GT$$GT$";
pub const RECEIVER_SEGMENT: &str = "_$LT$std..sync..mpsc..Receiver$LT$T$GT$$GT$";
pub const IPC_SENDER_SEGMENT: &str = "_$LT$ipc_channel..ipc..IpcSender$LT$T$GT$$GT$";
pub const IPC_RECEIVER_SEGMENT: &str = "_$LT$ipc_channel..ipc..IpcReceiver$LT$T$GT$$GT$";
pub const RESULT_SEGMENT: &str = "_$LT$core..result..Result$LT$T$C$$u20$E$GT$$GT$";

/// Builds a legacy-mangled symbol from its path segments, with a fixed
/// disambiguator hash.
pub fn mangled(segments: &[&str]) -> String {
    let mut out = String::from("_ZN");
    for segment in segments {
        out.push_str(&segment.len().to_string());
        out.push_str(segment);
    }
    out.push_str("17h0123456789abcdefE");
    out
}

pub fn send_symbol() -> String {
    mangled(&[SENDER_SEGMENT, "send"])
}

pub fn recv_symbol() -> String {
    mangled(&[RECEIVER_SEGMENT, "recv"])
}

pub fn unwrap_symbol() -> String {
    mangled(&[RESULT_SEGMENT, "unwrap"])
}

#[derive(Debug)]
pub struct WeatherFixture {
    pub set:         ModuleSet,
    /// the `send` invoke in the station module
    pub send_site:   InstrRef,
    /// the `recv` invoke in the dispatch module
    pub recv_site:   InstrRef,
    /// the switch the received value feeds after unwrapping
    pub switch_site: InstrRef,
}

/// Station module: `let reading = 3; tx.send(reading)` with the constant
/// spilled through an alloca, the shape the producer emits for locals.
fn station_module() -> (hermes_types::ir::Module, InstrId3) {
    let mut mb = ModuleBuilder::new("weatherstation");
    let file = mb.file("src/weatherstation.rs");
    let i32t = mb.int_type(32);
    let void = mb.void_type();
    let sender = mb.struct_type("std::sync::mpsc::Sender<weatherstation::Weather>");
    let sender_ptr = mb.pointer_to(sender);
    let i32_ptr = mb.pointer_to(i32t);

    mb.declaration(send_symbol());

    let mut fb = FunctionBuilder::new(mangled(&["weatherstation", "main"]))
        .subprogram("weatherstation::main");
    let entry = fb.block();
    let cont = fb.block();
    let unwind = fb.block();

    let tx_slot = fb.push_kind(entry, InstrKind::Alloca, sender_ptr);
    let reading_slot = fb.push_kind(entry, InstrKind::Alloca, i32_ptr);
    fb.push_kind(
        entry,
        InstrKind::Store {
            value: ValueRef::ConstInt { bits: 32, value: 3 },
            ptr:   ValueRef::Instr(reading_slot),
        },
        void,
    );
    let reading = fb.push_kind(entry, InstrKind::Load { ptr: ValueRef::Instr(reading_slot) }, i32t);
    let send = fb.push(
        entry,
        Instruction::new(
            InstrKind::Invoke {
                callee:     hermes_types::ir::Callee::Direct(send_symbol()),
                args:       vec![ValueRef::Instr(tx_slot), ValueRef::Instr(reading)],
                struct_ret: false,
                normal:     cont,
                unwind,
            },
            void,
        )
        .with_debug(file, 42),
    );
    fb.push_kind(cont, InstrKind::Ret { value: None }, void);
    fb.push_kind(unwind, InstrKind::Unreachable, void);
    let main = mb.function(fb);

    (mb.build(), InstrId3 { function: main, instr: send })
}

/// Dispatch module: `let msg = rx.recv().unwrap(); match msg { ... }` over
/// four message variants.
fn dispatch_module() -> (hermes_types::ir::Module, InstrId3, InstrId3) {
    let mut mb = ModuleBuilder::new("dispatch");
    let file = mb.file("src/dispatch.rs");
    let i32t = mb.int_type(32);
    let void = mb.void_type();
    let receiver = mb.struct_type("std::sync::mpsc::Receiver<Weather>");
    let receiver_ptr = mb.pointer_to(receiver);
    let result = mb.struct_type("core::result::Result<Weather, std::sync::mpsc::RecvError>");
    let result_ptr = mb.pointer_to(result);

    mb.declaration(recv_symbol());
    mb.declaration(unwrap_symbol());

    let mut fb = FunctionBuilder::new(mangled(&["dispatch", "run"])).subprogram("dispatch::run");
    let entry = fb.block();
    let unwrapped = fb.block();
    let branched = fb.block();
    let default = fb.block();
    let cases: Vec<_> = (0..4).map(|_| fb.block()).collect();
    let merge = fb.block();
    let unwind = fb.block();

    let rx_slot = fb.push_kind(entry, InstrKind::Alloca, receiver_ptr);
    let res_slot = fb.push_kind(entry, InstrKind::Alloca, result_ptr);
    let recv = fb.push(
        entry,
        Instruction::new(
            InstrKind::Invoke {
                callee:     hermes_types::ir::Callee::Direct(recv_symbol()),
                args:       vec![ValueRef::Instr(res_slot), ValueRef::Instr(rx_slot)],
                struct_ret: true,
                normal:     unwrapped,
                unwind,
            },
            void,
        )
        .with_debug(file, 10),
    );
    let unwrap = fb.push(
        unwrapped,
        Instruction::new(
            InstrKind::Invoke {
                callee:     hermes_types::ir::Callee::Direct(unwrap_symbol()),
                args:       vec![ValueRef::Instr(res_slot)],
                struct_ret: false,
                normal:     branched,
                unwind,
            },
            i32t,
        )
        .with_debug(file, 11),
    );
    let switch = fb.push(
        branched,
        Instruction::new(
            InstrKind::Switch {
                selector: ValueRef::Instr(unwrap),
                default,
                cases: cases.iter().enumerate().map(|(i, bb)| (i as i64, *bb)).collect(),
            },
            void,
        )
        .with_debug(file, 12),
    );
    for case in &cases {
        fb.push_kind(*case, InstrKind::Br { dest: merge }, void);
    }
    fb.push_kind(default, InstrKind::Ret { value: None }, void);
    fb.push_kind(merge, InstrKind::Ret { value: None }, void);
    fb.push_kind(unwind, InstrKind::Unreachable, void);
    let run = mb.function(fb);

    (
        mb.build(),
        InstrId3 { function: run, instr: recv },
        InstrId3 { function: run, instr: switch },
    )
}

/// function-local site handle, completed with the module id once the set is
/// assembled
#[derive(Debug, Clone, Copy)]
struct InstrId3 {
    function: FunctionId,
    instr:    hermes_types::ir::InstrId,
}

impl InstrId3 {
    fn in_module(self, module: ModuleId) -> InstrRef {
        InstrRef { module, function: self.function, instr: self.instr }
    }
}

pub fn weather_fixture() -> WeatherFixture {
    let (station, send) = station_module();
    let (dispatch, recv, switch) = dispatch_module();
    let set = ModuleSet::new(vec![station, dispatch]);
    WeatherFixture {
        set,
        send_site: send.in_module(ModuleId(0)),
        recv_site: recv.in_module(ModuleId(1)),
        switch_site: switch.in_module(ModuleId(1)),
    }
}
