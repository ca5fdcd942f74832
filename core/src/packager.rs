//! Packaging boundary: executable text + interface document → component bytes
//!
//! The byte layout of the component belongs entirely to the packager.

use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use uuid::Uuid;

use crate::config::CommandConfig;
use crate::error::{Result, WasmifyError};

pub trait Packager: Send + Sync {
    fn package(
        &self,
        executable: &str,
        interface: &str,
        world: &str,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Runs an external componentizer (`jco componentize` by default).
///
/// Inputs and output live in a private scratch directory that is removed
/// afterwards, whether or not packaging succeeded.
#[derive(Debug, Clone)]
pub struct CommandPackager {
    command: CommandConfig,
}

impl CommandPackager {
    pub fn new(command: CommandConfig) -> Self {
        Self { command }
    }

    async fn run(&self, scratch: &Path, executable: &str, interface: &str, world: &str) -> Result<Vec<u8>> {
        let js_path = scratch.join("bundle.js");
        let wit_path = scratch.join("world.wit");
        let out_path = scratch.join("component.wasm");

        write(&js_path, executable).await?;
        write(&wit_path, interface).await?;

        let output = Command::new(&self.command.command)
            .args(&self.command.args)
            .arg(&js_path)
            .arg("--wit")
            .arg(&wit_path)
            .arg("--world-name")
            .arg(world)
            .arg("--out")
            .arg(&out_path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| WasmifyError::Package(format!("Failed to run '{}': {}", self.command.command, e)))?;

        if !output.status.success() {
            return Err(WasmifyError::Package(format!(
                "'{}' exited with {}: {}",
                self.command.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        tokio::fs::read(&out_path)
            .await
            .map_err(|e| WasmifyError::io(out_path, e))
    }
}

impl Packager for CommandPackager {
    async fn package(&self, executable: &str, interface: &str, world: &str) -> Result<Vec<u8>> {
        let scratch = scratch_dir();
        tokio::fs::create_dir_all(&scratch)
            .await
            .map_err(|e| WasmifyError::io(&scratch, e))?;

        tracing::debug!(
            command = %self.command.command,
            world,
            scratch = %scratch.display(),
            "Packaging component"
        );

        let result = self.run(&scratch, executable, interface, world).await;

        if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
            tracing::warn!(scratch = %scratch.display(), error = %e, "Failed to remove scratch directory");
        }

        let bytes = result?;
        tracing::info!(world, bytes = bytes.len(), "Packaged component");
        Ok(bytes)
    }
}

fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("wasmify-{}", Uuid::new_v4()))
}

async fn write(path: &Path, contents: &str) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| WasmifyError::io(path, e))
}
