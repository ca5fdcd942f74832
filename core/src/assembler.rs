//! Component assembly
//!
//! Pipeline for one source file:
//!
//! ```text
//! resolve tsconfig ──┬── bundle ─────────────────────┬── package ── write <out_dir>/<name>.wasm
//!                    └── reflect ── synthesize world ─┘
//! ```
//!
//! Bundling and synthesis run concurrently and share nothing but the source
//! path. The output file is written last, so a failed build leaves nothing behind.

use std::path::{Path, PathBuf};

use crate::analysis::{Analyzer, ConfigResolver, ResolvedConfig, TsconfigResolver, TypeScriptAnalyzer};
use crate::bundler::{Bundler, CommandBundler};
use crate::config::Config;
use crate::error::{Result, WasmifyError};
use crate::interface::{self, InterfaceWorld};
use crate::packager::{CommandPackager, Packager};
use crate::reflector::Reflector;
use crate::types::{BuildResult, Diagnostic};

/// Extension of the emitted component
pub const COMPONENT_EXTENSION: &str = "wasm";

/// A synthesized world and the diagnostics reported while reflecting its module
#[derive(Debug, Clone)]
pub struct Synthesized {
    pub world: InterfaceWorld,
    pub diagnostics: Vec<Diagnostic>,
}

pub type DefaultAssembler = Assembler<TsconfigResolver, TypeScriptAnalyzer, CommandBundler, CommandPackager>;

pub struct Assembler<R, A, B, P> {
    reflector: Reflector<R, A>,
    bundler: B,
    packager: P,
}

impl DefaultAssembler {
    /// Filesystem config resolution, PEST reflection, and the configured external commands
    pub fn from_config(config: &Config) -> Self {
        Assembler::new(
            Reflector::new(TsconfigResolver, TypeScriptAnalyzer),
            CommandBundler::new(config.bundler.clone()),
            CommandPackager::new(config.packager.clone()),
        )
    }
}

impl<R, A, B, P> Assembler<R, A, B, P>
where
    R: ConfigResolver,
    A: Analyzer,
    B: Bundler,
    P: Packager,
{
    pub fn new(reflector: Reflector<R, A>, bundler: B, packager: P) -> Self {
        Self {
            reflector,
            bundler,
            packager,
        }
    }

    /// Compile `source_path` into a component under `out_dir` (the working
    /// directory when `None`). Any existing file at the output path is replaced.
    pub async fn build(&self, source_path: &Path, out_dir: Option<&Path>) -> Result<BuildResult> {
        let out_dir = match out_dir {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir().map_err(|e| WasmifyError::io(".", e))?,
        };
        let out_path = output_path(source_path, &out_dir)?;

        tracing::info!(source = %source_path.display(), out = %out_path.display(), "Building component");

        let config = self.reflector.resolve_config(source_path)?;

        let (executable, synthesized) = tokio::try_join!(
            self.bundler.bundle(source_path),
            self.synthesize_with(source_path, &config),
        )?;

        let interface = synthesized.world.to_string();
        let component = self
            .packager
            .package(&executable, &interface, &synthesized.world.name)
            .await?;

        tokio::fs::write(&out_path, &component)
            .await
            .map_err(|e| WasmifyError::io(&out_path, e))?;

        tracing::info!(out = %out_path.display(), bytes = component.len(), "Wrote component");

        Ok(BuildResult {
            out_path,
            world: synthesized.world.name,
            diagnostics: synthesized.diagnostics,
        })
    }

    /// Reflect `source_path` and synthesize its interface world, without bundling
    pub async fn interface(&self, source_path: &Path) -> Result<Synthesized> {
        let config = self.reflector.resolve_config(source_path)?;
        self.synthesize_with(source_path, &config).await
    }

    pub fn reflector(&self) -> &Reflector<R, A> {
        &self.reflector
    }

    async fn synthesize_with(&self, source_path: &Path, config: &ResolvedConfig) -> Result<Synthesized> {
        let reflection = self.reflector.reflect_with(source_path, config).await?;
        let world = interface::synthesize(&reflection.module)?;

        tracing::debug!(world = %world.name, exports = world.exports.len(), "Synthesized interface");

        Ok(Synthesized {
            world,
            diagnostics: reflection.diagnostics,
        })
    }
}

/// `<out_dir>/<source base name>.wasm`
pub fn output_path(source_path: &Path, out_dir: &Path) -> Result<PathBuf> {
    let file_name = source_path.file_name().ok_or_else(|| {
        WasmifyError::io(
            source_path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "source path has no file name"),
        )
    })?;

    Ok(out_dir.join(Path::new(file_name).with_extension(COMPONENT_EXTENSION)))
}
