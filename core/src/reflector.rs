//! Declaration reflection for a single source file

use std::path::Path;

use crate::analysis::{AnalysisConfig, Analyzer, ConfigResolver, ResolvedConfig};
use crate::error::{Result, WasmifyError};
use crate::types::{Diagnostic, Module};

/// A reflected module with the non-fatal diagnostics gathered on the way
#[derive(Debug, Clone)]
pub struct Reflection {
    pub module: Module,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Reflector<R, A> {
    resolver: R,
    analyzer: A,
}

impl<R: ConfigResolver, A: Analyzer> Reflector<R, A> {
    pub fn new(resolver: R, analyzer: A) -> Self {
        Self { resolver, analyzer }
    }

    /// Locate the type configuration governing `source_path`
    pub fn resolve_config(&self, source_path: &Path) -> Result<ResolvedConfig> {
        self.resolver
            .resolve(source_path)
            .ok_or_else(|| WasmifyError::ConfigNotFound {
                path: source_path.to_path_buf(),
            })
    }

    pub async fn reflect(&self, source_path: &Path) -> Result<Reflection> {
        let config = self.resolve_config(source_path)?;
        self.reflect_with(source_path, &config).await
    }

    /// Reflect under an already-resolved configuration.
    ///
    /// Only the first module the analyzer returns is used; any others are ignored.
    pub async fn reflect_with(&self, source_path: &Path, config: &ResolvedConfig) -> Result<Reflection> {
        tracing::debug!(
            source = %source_path.display(),
            tsconfig = %config.path.display(),
            "Reflecting declarations"
        );

        let analysis = self
            .analyzer
            .analyze(
                &[source_path.to_path_buf()],
                &AnalysisConfig {
                    config_file_path: config.path.clone(),
                },
            )
            .await?;

        for diagnostic in &analysis.diagnostics {
            tracing::warn!(%diagnostic, "Analysis reported an issue");
        }

        let module = analysis
            .modules
            .into_iter()
            .next()
            .ok_or_else(|| WasmifyError::NoModulesFound {
                path: source_path.to_path_buf(),
            })?;

        Ok(Reflection {
            module,
            diagnostics: analysis.diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analysis;
    use crate::types::Declaration;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedResolver(Option<PathBuf>);

    impl ConfigResolver for FixedResolver {
        fn resolve(&self, _source_path: &Path) -> Option<ResolvedConfig> {
            self.0.clone().map(|path| ResolvedConfig { path })
        }
    }

    #[derive(Default)]
    struct FixedAnalyzer {
        modules: Vec<Module>,
        diagnostics: Vec<Diagnostic>,
        calls: AtomicUsize,
    }

    impl Analyzer for FixedAnalyzer {
        async fn analyze(&self, files: &[PathBuf], config: &AnalysisConfig) -> Result<Analysis> {
            assert_eq!(files.len(), 1);
            assert_eq!(config.config_file_path, PathBuf::from("/proj/tsconfig.json"));
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Analysis {
                modules: self.modules.clone(),
                diagnostics: self.diagnostics.clone(),
            })
        }
    }

    fn module(path: &str, names: &[&str]) -> Module {
        Module {
            source_path: PathBuf::from(path),
            declarations: names.iter().map(|n| Declaration::other(*n)).collect(),
        }
    }

    fn resolver() -> FixedResolver {
        FixedResolver(Some(PathBuf::from("/proj/tsconfig.json")))
    }

    #[test]
    fn test_missing_config_fails_before_analysis() {
        let reflector = Reflector::new(FixedResolver(None), FixedAnalyzer::default());

        let err = tokio_test::block_on(reflector.reflect(Path::new("/proj/a.ts"))).unwrap_err();

        assert!(matches!(err, WasmifyError::ConfigNotFound { .. }));
        assert_eq!(reflector.analyzer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_modules_found() {
        let reflector = Reflector::new(resolver(), FixedAnalyzer::default());

        let err = reflector.reflect(Path::new("/proj/a.ts")).await.unwrap_err();

        match err {
            WasmifyError::NoModulesFound { path } => assert_eq!(path, PathBuf::from("/proj/a.ts")),
            other => panic!("Expected NoModulesFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_first_module_wins() {
        let analyzer = FixedAnalyzer {
            modules: vec![module("/proj/a.ts", &["first"]), module("/proj/b.ts", &["second"])],
            ..Default::default()
        };
        let reflector = Reflector::new(resolver(), analyzer);

        let reflection = reflector.reflect(Path::new("/proj/a.ts")).await.unwrap();

        assert_eq!(reflection.module.declarations[0].name, "first");
    }

    #[tokio::test]
    async fn test_diagnostics_are_returned_not_thrown() {
        let analyzer = FixedAnalyzer {
            modules: vec![module("/proj/a.ts", &[])],
            diagnostics: vec![Diagnostic::error("/proj/a.ts", "Type mismatch", "type-error")],
            ..Default::default()
        };
        let reflector = Reflector::new(resolver(), analyzer);

        let reflection = reflector.reflect(Path::new("/proj/a.ts")).await.unwrap();

        assert_eq!(reflection.diagnostics.len(), 1);
        assert!(reflection.diagnostics[0].is_error());
    }
}
