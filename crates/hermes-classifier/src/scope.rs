//! Maps instructions to the scope string that names their graph node.

use hermes_types::ir::{InstrRef, ModuleSet};

/// The debug-location source file of the instruction; without debug info the
/// enclosing module's name is the only identity left.
pub fn namespace_of(set: &ModuleSet, site: InstrRef) -> String {
    let module = set.module(site.module);
    set.instr(site)
        .debug
        .and_then(|loc| module.file(loc.file))
        .map(str::to_string)
        .unwrap_or_else(|| module.name.clone())
}
