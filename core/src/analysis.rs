//! Static analysis boundary
//!
//! Two capabilities sit here: finding the `tsconfig.json` that governs a source
//! file, and reflecting source files into [`Module`]s. The defaults are
//! filesystem-backed; tests substitute their own.

use serde::Deserialize;
use std::future::Future;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::parser::{self, ParseOptions};
use crate::types::{Diagnostic, Module};

const TSCONFIG_FILE: &str = "tsconfig.json";

/* ===================== Config Resolution ===================== */

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub path: PathBuf,
}

pub trait ConfigResolver: Send + Sync {
    /// Find the type configuration governing `source_path`, if any
    fn resolve(&self, source_path: &Path) -> Option<ResolvedConfig>;
}

/// Looks for `tsconfig.json` next to the source file, then in each ancestor directory
#[derive(Debug, Clone, Default)]
pub struct TsconfigResolver;

impl ConfigResolver for TsconfigResolver {
    fn resolve(&self, source_path: &Path) -> Option<ResolvedConfig> {
        let parent = source_path.parent().unwrap_or(Path::new(""));
        let start = if parent.is_absolute() {
            parent.to_path_buf()
        } else {
            std::env::current_dir().ok()?.join(parent)
        };

        start
            .ancestors()
            .map(|dir| dir.join(TSCONFIG_FILE))
            .find(|candidate| candidate.is_file())
            .map(|path| ResolvedConfig { path })
    }
}

/* ===================== Analysis ===================== */

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub config_file_path: PathBuf,
}

/// Output of one analysis run. Diagnostics never fail the run on their own.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub modules: Vec<Module>,
    pub diagnostics: Vec<Diagnostic>,
}

pub trait Analyzer: Send + Sync {
    fn analyze(
        &self,
        files: &[PathBuf],
        config: &AnalysisConfig,
    ) -> impl Future<Output = Result<Analysis>> + Send;
}

/// The subset of `tsconfig.json` that affects reflection
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TsConfig {
    #[serde(default)]
    compiler_options: CompilerOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompilerOptions {
    strict: Option<bool>,
    no_implicit_any: Option<bool>,
}

impl CompilerOptions {
    fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            no_implicit_any: self.no_implicit_any.or(self.strict).unwrap_or(false),
        }
    }
}

/// Reflects TypeScript files with the PEST declaration grammar
#[derive(Debug, Clone, Default)]
pub struct TypeScriptAnalyzer;

impl TypeScriptAnalyzer {
    async fn compiler_options(&self, config: &AnalysisConfig, diagnostics: &mut Vec<Diagnostic>) -> CompilerOptions {
        let path = &config.config_file_path;
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) => {
                diagnostics.push(Diagnostic::warning(
                    path,
                    format!("Could not read type configuration: {}", e),
                    "tsconfig-unreadable",
                ));
                return CompilerOptions::default();
            }
        };

        match serde_json::from_str::<TsConfig>(&contents) {
            Ok(tsconfig) => tsconfig.compiler_options,
            Err(e) => {
                diagnostics.push(
                    Diagnostic::warning(
                        path,
                        format!("Could not parse type configuration, using defaults: {}", e),
                        "tsconfig-unreadable",
                    )
                    .at(e.line(), e.column()),
                );
                CompilerOptions::default()
            }
        }
    }
}

impl Analyzer for TypeScriptAnalyzer {
    async fn analyze(&self, files: &[PathBuf], config: &AnalysisConfig) -> Result<Analysis> {
        let mut analysis = Analysis::default();
        let options = self
            .compiler_options(config, &mut analysis.diagnostics)
            .await
            .parse_options();

        for file in files {
            let source = match tokio::fs::read_to_string(file).await {
                Ok(source) => source,
                Err(e) => {
                    analysis.diagnostics.push(Diagnostic::error(
                        file,
                        format!("Could not read source file: {}", e),
                        "file-unreadable",
                    ));
                    continue;
                }
            };

            match parser::parse_module(&source, file, options) {
                Ok(parsed) => {
                    tracing::debug!(
                        path = %file.display(),
                        declarations = parsed.module.declarations.len(),
                        "Reflected module"
                    );
                    analysis.modules.push(parsed.module);
                    analysis.diagnostics.extend(parsed.diagnostics);
                }
                Err(e) => {
                    let (line, column) = e.position().unwrap_or((0, 0));
                    analysis.diagnostics.push(
                        Diagnostic::error(file, e.message(), "syntax-error").at(line, column),
                    );
                }
            }
        }

        Ok(analysis)
    }
}
