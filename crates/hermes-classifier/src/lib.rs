//! Channel-site discovery.
//!
//! Three small layers: [`symbols`] recognizes send/receive/unwrap call sites
//! from demangled names and extracts the carried type out of the channel
//! struct, [`scope`] maps an instruction to its graph scope, and [`scanner`]
//! walks every module and emits one [`hermes_types::MessagingNode`] per
//! channel call it can make sense of.

pub mod scanner;
pub use scanner::scan_modules;
pub mod scope;
pub use scope::namespace_of;
pub mod symbols;
pub use symbols::*;
