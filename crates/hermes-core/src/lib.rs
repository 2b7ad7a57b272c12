//! Module loading and symbol demangling for the hermes pipeline.
//!
//! The IR itself is produced by an external extraction pass; this crate turns
//! its dumps into a finalized [`hermes_types::ir::ModuleSet`] and wraps the
//! demangler the classifier leans on. Per-module load failures are
//! recoverable: a bad file inside a directory scan is logged and skipped.

pub mod demangle;
pub use demangle::demangle;
pub mod errors;
pub use errors::LoadError;
pub mod loading;
pub use loading::{load_module_set, MODULE_EXTENSION};

#[cfg(any(test, feature = "tests"))]
pub mod test_utils;
