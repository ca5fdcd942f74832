//! Bundling boundary: flatten an entry module and its imports into one ESM text

use sha2::{Digest, Sha256};
use std::future::Future;
use std::path::Path;
use tokio::process::Command;

use crate::config::CommandConfig;
use crate::error::{Result, WasmifyError};

pub trait Bundler: Send + Sync {
    fn bundle(&self, entry: &Path) -> impl Future<Output = Result<String>> + Send;
}

/// Runs an external bundler (esbuild by default) and captures its stdout
#[derive(Debug, Clone)]
pub struct CommandBundler {
    command: CommandConfig,
}

impl CommandBundler {
    pub fn new(command: CommandConfig) -> Self {
        Self { command }
    }
}

impl Bundler for CommandBundler {
    async fn bundle(&self, entry: &Path) -> Result<String> {
        tracing::debug!(
            command = %self.command.command,
            entry = %entry.display(),
            "Bundling"
        );

        let output = Command::new(&self.command.command)
            .args(&self.command.args)
            .arg(entry)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| WasmifyError::Bundle(format!("Failed to run '{}': {}", self.command.command, e)))?;

        if !output.status.success() {
            return Err(WasmifyError::Bundle(format!(
                "'{}' exited with {}: {}",
                self.command.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8(output.stdout)
            .map_err(|e| WasmifyError::Bundle(format!("Bundle is not valid UTF-8: {}", e)))?;

        tracing::info!(
            entry = %entry.display(),
            bytes = text.len(),
            hash = %short_hash(&text),
            "Bundled"
        );
        Ok(text)
    }
}

/// First 8 hex chars of the SHA-256 of `text`
pub fn short_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_hash() {
        let hash = short_hash("export function add(a, b) { return a + b }");
        assert_eq!(hash.len(), 8);
        assert_eq!(hash, short_hash("export function add(a, b) { return a + b }"));
        assert_ne!(hash, short_hash("export function sub(a, b) { return a - b }"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_stdout() {
        let bundler = CommandBundler::new(CommandConfig {
            command: "cat".to_string(),
            args: vec![],
        });
        let dir = std::env::temp_dir().join(format!("wasmify-bundle-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let entry = dir.join("entry.js");
        std::fs::write(&entry, "export const x = 1;\n").unwrap();

        let text = bundler.bundle(&entry).await.unwrap();

        assert_eq!(text, "export const x = 1;\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_reports_stderr() {
        let bundler = CommandBundler::new(CommandConfig {
            command: "cat".to_string(),
            args: vec![],
        });

        let err = bundler
            .bundle(Path::new("/definitely/not/here.ts"))
            .await
            .unwrap_err();

        match err {
            WasmifyError::Bundle(message) => assert!(message.contains("here.ts")),
            other => panic!("Expected Bundle error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_program() {
        let bundler = CommandBundler::new(CommandConfig {
            command: format!("no-such-bundler-{}", uuid::Uuid::new_v4()),
            args: vec![],
        });

        let err = bundler.bundle(Path::new("a.ts")).await.unwrap_err();
        assert!(matches!(err, WasmifyError::Bundle(_)));
    }
}
