//! Layered configuration for wasmify
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. TOML file (`wasmify.toml` in the working directory, or an explicit path)
//! 3. Environment variables prefixed with `WASMIFY_` (`__` separates nesting,
//!    e.g. `WASMIFY_BUNDLER__COMMAND`)
//! 4. Explicit overrides given to [`ConfigBuilder`]

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

const DEFAULT_CONFIG_FILE: &str = "wasmify.toml";
const CONFIG_PATH_ENV: &str = "WASMIFY_CONFIG_PATH";

/// An external program invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Where artifacts are written. Falls back to the working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,

    /// Flattens an entry module into one ESM text on stdout
    pub bundler: CommandConfig,

    /// Turns executable text plus an interface document into a component
    pub packager: CommandConfig,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load configuration from the default sources
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    /// Output directory, resolved against the working directory when unset
    pub fn resolve_out_dir(&self) -> Result<PathBuf> {
        match &self.out_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().map_err(|e| crate::error::WasmifyError::io(".", e)),
        }
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    out_dir: Option<PathBuf>,
}

impl ConfigBuilder {
    /// Read settings from this file instead of searching for `wasmify.toml`
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn out_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.out_dir = dir;
        self
    }

    pub fn build(self) -> Result<Config> {
        let explicit_path = self
            .config_path
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let file_source = match &explicit_path {
            Some(path) => file_source(path).required(true),
            None => file_source(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };

        let mut builder = ::config::Config::builder()
            .set_default("bundler.command", "esbuild")?
            .set_default(
                "bundler.args",
                vec!["--bundle", "--format=esm", "--platform=browser"],
            )?
            .set_default("packager.command", "jco")?
            .set_default("packager.args", vec!["componentize"])?
            .add_source(file_source)
            .add_source(
                ::config::Environment::with_prefix("WASMIFY")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(" ")
                    .with_list_parse_key("bundler.args")
                    .with_list_parse_key("packager.args")
                    .try_parsing(true),
            );

        if let Some(dir) = self.out_dir {
            builder = builder.set_override("out_dir", dir.to_string_lossy().into_owned())?;
        }

        let config: Config = builder.build()?.try_deserialize()?;
        tracing::debug!(?config, "Loaded configuration");
        Ok(config)
    }
}

fn file_source(path: &Path) -> ::config::File<::config::FileSourceFile, ::config::FileFormat> {
    ::config::File::from(path).format(::config::FileFormat::Toml)
}
