use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}")]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed module dump {path}")]
    Malformed {
        path:   PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no loadable modules under {0}")]
    NoModules(PathBuf),
}
