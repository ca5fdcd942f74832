use std::path::PathBuf;

use thiserror::Error;

/// Every way a build can fail. Each variant aborts the whole build.
#[derive(Debug, Error)]
pub enum WasmifyError {
    #[error("No tsconfig.json found for {}", path.display())]
    ConfigNotFound { path: PathBuf },

    #[error("No modules found in {}", path.display())]
    NoModulesFound { path: PathBuf },

    #[error("Unsupported type: {descriptor}")]
    UnsupportedType { descriptor: String },

    #[error("Function '{name}' is exported more than once")]
    DuplicateExport { name: String },

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Bundling failed: {0}")]
    Bundle(String),

    #[error("Packaging failed: {0}")]
    Package(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ::config::ConfigError),
}

impl WasmifyError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WasmifyError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, WasmifyError>;
