//! Channel-site records and the receiver usage lattice.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ir::{InstrRef, ModuleSet};

/// How a received value is consumed downstream of the receive call, ordered
/// by informativeness. When the CFG pass sees diverging branches the maximum
/// over this ordering wins.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumIter,
    Serialize,
    Deserialize,
)]
pub enum UsageType {
    #[default]
    Unchecked,
    DirectUse,
    DirectHandlerCall,
    UnwrappedDirectUse,
    UnwrappedToHandlerFunction,
    UnwrappedToSwitch,
}

/// Receiver classification: the class plus the instruction that pinned it
/// (handler invocation or switch), when one exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub class: UsageType,
    pub at:    Option<InstrRef>,
}

impl Usage {
    pub fn new(class: UsageType, at: Option<InstrRef>) -> Self {
        Self { class, at }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, Serialize, Deserialize)]
pub enum SiteKind {
    Send,
    Receive,
}

/// Kind-discriminated payload of a site: sends get the propagated constant,
/// receives get the usage classification. Both start out unannotated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SitePayload {
    Send { assignment: Option<i64> },
    Receive { usage: Usage },
}

/// One send or receive call site discovered by the scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagingNode {
    /// lookup key into the module set; only valid for the arena the scanner
    /// ran over
    pub site:         InstrRef,
    /// payload type carried by the channel, e.g. `weatherstation::Weather`
    pub carried_type: String,
    /// debug source file, falling back to the module name
    pub scope:        String,
    pub payload:      SitePayload,
}

impl MessagingNode {
    pub fn send(site: InstrRef, carried_type: String, scope: String) -> Self {
        Self { site, carried_type, scope, payload: SitePayload::Send { assignment: None } }
    }

    pub fn receive(site: InstrRef, carried_type: String, scope: String) -> Self {
        Self { site, carried_type, scope, payload: SitePayload::Receive { usage: Usage::default() } }
    }

    pub fn kind(&self) -> SiteKind {
        match self.payload {
            SitePayload::Send { .. } => SiteKind::Send,
            SitePayload::Receive { .. } => SiteKind::Receive,
        }
    }

    pub fn assignment(&self) -> Option<i64> {
        match self.payload {
            SitePayload::Send { assignment } => assignment,
            SitePayload::Receive { .. } => None,
        }
    }

    /// Boundary encoding of the assignment: `-1` where a flat signed slot is
    /// required and nothing was propagated.
    pub fn assignment_encoded(&self) -> i64 {
        self.assignment().unwrap_or(-1)
    }

    pub fn usage(&self) -> Usage {
        match self.payload {
            SitePayload::Receive { usage } => usage,
            SitePayload::Send { .. } => Usage::default(),
        }
    }

    /// The single mutation point for sends, exercised once before matching.
    pub fn set_assignment(&mut self, value: Option<i64>) {
        if let SitePayload::Send { assignment } = &mut self.payload {
            *assignment = value;
        }
    }

    /// The single mutation point for receives, exercised once before matching.
    pub fn set_usage(&mut self, value: Usage) {
        if let SitePayload::Receive { usage } = &mut self.payload {
            *usage = value;
        }
    }

    /// Debug line of the call site, when the producer kept debug info.
    pub fn line(&self, set: &ModuleSet) -> Option<u32> {
        set.instr(self.site).line()
    }
}

/// Scanner output: every send and receive site found across the module set,
/// in module/function/block order. The two vectors own the records; every
/// later stage borrows from them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScannedSites {
    pub sends:    Vec<MessagingNode>,
    pub receives: Vec<MessagingNode>,
}

/// A matched send/receive edge. Borrows stay valid for as long as the
/// scanner's output vectors do.
pub type SitePair<'a> = (&'a MessagingNode, &'a MessagingNode);

/// Pairs bucketed by the *sending* scope. Scopes that only ever receive are
/// present with an empty bucket so they still render as graph nodes.
/// Insertion order is preserved to keep emission deterministic.
pub type MessageMap<'a> = IndexMap<String, Vec<SitePair<'a>>>;

/// Sites bucketed by scope and source line, the shape the graph emitter
/// renders ports from.
pub type NodeMap<'a> = IndexMap<String, BTreeMap<u32, Vec<&'a MessagingNode>>>;
