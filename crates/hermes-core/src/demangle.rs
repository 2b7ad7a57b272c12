//! Thin wrapper over the demangler so the rest of the pipeline sees a pure
//! `&str -> Option<String>` contract.

/// Demangles a Rust symbol, keeping the trailing disambiguator hash. The
/// classifier's suffix rule relies on it.
pub fn demangle(symbol: &str) -> Option<String> {
    rustc_demangle::try_demangle(symbol).ok().map(|name| name.to_string())
}
