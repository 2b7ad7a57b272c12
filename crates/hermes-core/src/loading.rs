//! Turns module dumps on disk into a finalized [`ModuleSet`].

use std::{fs, path::Path};

use hermes_types::ir::{Module, ModuleSet};
use tracing::{debug, error, info};

use crate::errors::LoadError;

/// File suffix the directory scan picks up.
pub const MODULE_EXTENSION: &str = ".ir.json";

/// Loads a single dump or every `*.ir.json` directly under a directory.
///
/// Inside a directory scan a malformed file is logged and skipped; the call
/// only fails when nothing loadable remains. A path naming a single file is
/// strict: its error is returned as-is. Directory entries are visited in
/// name order so the module set (and everything derived from it) is stable.
pub fn load_module_set(path: &Path) -> Result<ModuleSet, LoadError> {
    let mut modules = Vec::new();

    if path.is_dir() {
        let mut entries: Vec<_> = fs::read_dir(path)
            .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file() &&
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.ends_with(MODULE_EXTENSION))
            })
            .collect();
        entries.sort();

        for entry in entries {
            match load_module(&entry) {
                Ok(module) => {
                    debug!(module = %module.name, path = %entry.display(), "loaded module");
                    modules.push(module);
                }
                Err(err) => error!(%err, path = %entry.display(), "skipping module"),
            }
        }
    } else {
        modules.push(load_module(path)?);
    }

    if modules.is_empty() {
        return Err(LoadError::NoModules(path.to_path_buf()))
    }

    info!(modules = modules.len(), "module set loaded");
    Ok(ModuleSet::new(modules))
}

fn load_module(path: &Path) -> Result<Module, LoadError> {
    let raw =
        fs::read_to_string(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&raw).map_err(|source| LoadError::Malformed { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod test {
    use std::fs;

    use hermes_types::ir::ModuleBuilder;

    use super::*;

    fn dump_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("hermes-load-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn directory_scan_skips_malformed_dumps() {
        let dir = dump_dir("scan");
        let module = ModuleBuilder::new("good").build();
        fs::write(dir.join("good.ir.json"), serde_json::to_string(&module).unwrap()).unwrap();
        fs::write(dir.join("bad.ir.json"), "{ not json").unwrap();
        fs::write(dir.join("ignored.txt"), "not a dump").unwrap();

        let set = load_module_set(&dir).unwrap();
        assert_eq!(set.modules().len(), 1);
        assert_eq!(set.modules()[0].name, "good");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = dump_dir("empty");
        assert!(matches!(load_module_set(&dir), Err(LoadError::NoModules(_))));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn single_file_errors_are_strict() {
        let dir = dump_dir("strict");
        let bad = dir.join("bad.ir.json");
        fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(load_module_set(&bad), Err(LoadError::Malformed { .. })));
        fs::remove_dir_all(&dir).unwrap();
    }
}
