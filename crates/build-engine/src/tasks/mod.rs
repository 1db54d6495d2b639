//! Build Tasks
//!
//! Each task is a fallible transform over the shared compiler context.
//! Tasks catch their own tool/IO failures and surface them as
//! `BuildError`; the pipeline driver halts at the first error, leaving
//! partial on-disk artifacts in place for inspection.

pub mod apk_builder;
pub mod bundletool;
pub mod load_component_info;
pub mod manifest;
pub mod merge_resources;
pub mod multidex;
pub mod package_resources;
pub mod payload;
pub mod read_build_info;
pub mod sign;
pub mod zipalign;

use std::path::Path;

use tokio::process::Command;
use tracing::debug;

use crate::BuildError;

/// Run an external tool; non-zero exit is fatal with stderr attached.
pub(crate) async fn run_tool(tool: &'static str, cmd: &mut Command) -> Result<(), BuildError> {
    debug!("invoking {}: {:?}", tool, cmd.as_std());
    let output = cmd.output().await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BuildError::ToolFailed {
            tool,
            message: stderr.trim().to_string(),
        });
    }
    Ok(())
}

/// Command for a portable jar tool under a RAM ceiling.
pub(crate) fn java_jar_cmd(jar: &Path, ram_mb: u32) -> Command {
    let mut cmd = Command::new("java");
    cmd.arg(format!("-Xmx{}M", ram_mb)).arg("-jar").arg(jar);
    cmd
}

/// Recursively copy a directory tree; existing files are overwritten.
pub(crate) fn copy_tree(from: &Path, to: &Path) -> Result<(), BuildError> {
    for entry in walkdir::WalkDir::new(from) {
        let entry = entry.map_err(|e| BuildError::Config(format!("walking {:?}: {}", from, e)))?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| BuildError::Config(format!("copying {:?}: {}", entry.path(), e)))?;
        let target = to.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
