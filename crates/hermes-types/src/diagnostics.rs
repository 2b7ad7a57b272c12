//! Analyzer side-output as a passed-in capability.
//!
//! Per-site analysis failure is data, not an error: the analyzers degrade the
//! record and describe what happened through the sink their caller handed
//! them. There is no process-global diagnostic state.

use std::fmt;

use crate::ir::InstrRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// a phi join was crossed without splitting exploration
    PhiEncountered { site: InstrRef },
    /// the backward walk from a send payload found no constant store
    NoConstantStore { site: InstrRef },
    DemangleFailed { symbol: String },
    /// a channel call whose handle struct didn't parse into a carried type
    UnknownChannelStruct { site: InstrRef, struct_name: String },
    /// receiver classification fell through to `DirectUse` with no evidence
    UnresolvedUsage { site: InstrRef },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::PhiEncountered { site } => {
                write!(f, "phi node crossed at {site}, operands not split-explored")
            }
            Diagnostic::NoConstantStore { site } => {
                write!(f, "no constant store reaches the send at {site}")
            }
            Diagnostic::DemangleFailed { symbol } => write!(f, "failed to demangle `{symbol}`"),
            Diagnostic::UnknownChannelStruct { site, struct_name } => {
                write!(f, "unrecognized channel struct `{struct_name}` at {site}")
            }
            Diagnostic::UnresolvedUsage { site } => {
                write!(f, "no usage evidence for the receive at {site}")
            }
        }
    }
}

pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Forwards every diagnostic to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(%diagnostic, "analysis note");
    }
}

/// Swallows everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&mut self, _diagnostic: Diagnostic) {}
}

/// Collects diagnostics in memory, mainly for tests and for draining a
/// parallel scan back into a caller-owned sink.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub reports: Vec<Diagnostic>,
}

impl MemorySink {
    pub fn drain_into(&mut self, other: &mut dyn DiagnosticSink) {
        for diagnostic in self.reports.drain(..) {
            other.report(diagnostic);
        }
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.reports.push(diagnostic);
    }
}
