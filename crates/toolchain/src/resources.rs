//! Bundled Resource Cache
//!
//! Resolves paths to the build tools and runtime jars shipped with the
//! server. Each resource is copied out of the bundled tree into a
//! per-instance temp directory on first request, marked executable, and
//! cached for the lifetime of the instance.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::{HostOs, Tool, ToolchainError};

/// Resolves and caches bundled build tools and runtime resources.
pub struct Resources {
    root: PathBuf,
    host: Option<HostOs>,
    temp_dir: TempDir,
    cache: Mutex<HashMap<String, PathBuf>>,
    // Serializes JVM-heavy dexer child processes across builds sharing
    // this instance; running several unbounded dx invocations on one
    // host exhausts memory.
    dexer_lock: tokio::sync::Mutex<()>,
}

impl Resources {
    /// Create a resource cache over the unpacked server resource tree.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ToolchainError> {
        Ok(Self {
            root: root.into(),
            host: HostOs::detect(),
            temp_dir: TempDir::new()?,
            cache: Mutex::new(HashMap::new()),
            dexer_lock: tokio::sync::Mutex::new(()),
        })
    }

    #[doc(hidden)]
    pub fn with_host(root: impl Into<PathBuf>, host: Option<HostOs>) -> Result<Self, ToolchainError> {
        let mut resources = Self::new(root)?;
        resources.host = host;
        Ok(resources)
    }

    /// Root of the bundled resource tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a bundled resource, extracted to a temp file on
    /// first request. Repeated calls return the cached path without
    /// copying again.
    pub fn resource(&self, rel_path: &str) -> Result<PathBuf, ToolchainError> {
        let mut cache = self.cache.lock();
        if let Some(path) = cache.get(rel_path) {
            return Ok(path.clone());
        }

        let source = self.root.join(rel_path);
        if !source.is_file() {
            return Err(ToolchainError::ResourceNotFound(rel_path.to_string()));
        }

        let target = self.temp_dir.path().join(rel_path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&source, &target)?;
        mark_executable(&target)?;

        debug!("extracted bundled resource {} -> {:?}", rel_path, target);
        cache.insert(rel_path.to_string(), target.clone());
        Ok(target)
    }

    /// Resolve a bundled tool. `UnsupportedHost` when the host has no
    /// binary for it.
    pub fn tool(&self, tool: Tool) -> Result<PathBuf, ToolchainError> {
        let rel = tool
            .relative_path(self.host)
            .ok_or(ToolchainError::UnsupportedHost { tool: tool.name() })?;
        self.resource(&rel)
    }

    pub fn aapt(&self) -> Result<PathBuf, ToolchainError> {
        self.tool(Tool::Aapt)
    }

    pub fn aapt2(&self) -> Result<PathBuf, ToolchainError> {
        self.tool(Tool::Aapt2)
    }

    pub fn zipalign(&self) -> Result<PathBuf, ToolchainError> {
        self.tool(Tool::Zipalign)
    }

    pub fn apksigner(&self) -> Result<PathBuf, ToolchainError> {
        self.tool(Tool::Apksigner)
    }

    pub fn dx(&self) -> Result<PathBuf, ToolchainError> {
        self.tool(Tool::Dx)
    }

    pub fn bundletool(&self) -> Result<PathBuf, ToolchainError> {
        self.tool(Tool::Bundletool)
    }

    /// `jarsigner` ships with the JDK rather than with the server:
    /// JAVA_HOME first, then PATH.
    pub fn jarsigner(&self) -> Result<PathBuf, ToolchainError> {
        if let Ok(java_home) = std::env::var("JAVA_HOME") {
            let exe = if cfg!(windows) { "jarsigner.exe" } else { "jarsigner" };
            let candidate = PathBuf::from(java_home).join("bin").join(exe);
            if candidate.is_file() {
                return Ok(candidate);
            }
            warn!("JAVA_HOME set but {:?} not found, falling back to PATH", candidate);
        }
        which::which("jarsigner").map_err(|_| ToolchainError::JarsignerNotFound)
    }

    /// Build-info JSON for all built-in components.
    pub fn simple_components_json(&self) -> Result<PathBuf, ToolchainError> {
        self.resource("components/simple_components.json")
    }

    /// Stripped-down Android runtime jar used as a dex input.
    pub fn android_runtime_jar(&self) -> Result<PathBuf, ToolchainError> {
        self.resource("runtime/android-runtime.jar")
    }

    /// Kawa Scheme runtime backing the generated app code.
    pub fn kawa_runtime_jar(&self) -> Result<PathBuf, ToolchainError> {
        self.resource("runtime/kawa-runtime.jar")
    }

    /// Crash reporter, bundled into companion builds only.
    pub fn acra_jar(&self) -> Result<PathBuf, ToolchainError> {
        self.resource("runtime/acra-runtime.jar")
    }

    /// A component-declared library jar, bundled under `libs/`.
    pub fn library_jar(&self, name: &str) -> Result<PathBuf, ToolchainError> {
        self.resource(&format!("libs/{}", name))
    }

    /// Every support jar shipped under `support/`, in directory order.
    pub fn support_jars(&self) -> Result<Vec<PathBuf>, ToolchainError> {
        let dir = self.root.join("support");
        let mut jars = Vec::new();
        if dir.is_dir() {
            for entry in std::fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.extension().map(|e| e == "jar").unwrap_or(false) {
                    jars.push(path);
                }
            }
        }
        Ok(jars)
    }

    /// Lock guarding JVM-heavy dexer invocations.
    pub async fn dexer_guard(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.dexer_lock.lock().await
    }
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    std::fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_root() -> TempDir {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("tools/linux")).unwrap();
        std::fs::write(root.path().join("tools/linux/aapt2"), b"#!/bin/true").unwrap();
        std::fs::write(root.path().join("tools/dx.jar"), b"PK").unwrap();
        root
    }

    #[test]
    fn resource_extraction_is_cached() {
        let root = fixture_root();
        let resources = Resources::new(root.path()).unwrap();

        let first = resources.resource("tools/dx.jar").unwrap();
        let mtime = std::fs::metadata(&first).unwrap().modified().unwrap();
        let second = resources.resource("tools/dx.jar").unwrap();

        assert_eq!(first, second);
        // Not re-extracted on the second call
        assert_eq!(mtime, std::fs::metadata(&second).unwrap().modified().unwrap());
    }

    #[test]
    fn missing_resource_is_an_error() {
        let root = fixture_root();
        let resources = Resources::new(root.path()).unwrap();
        assert!(matches!(
            resources.resource("tools/nope.jar"),
            Err(ToolchainError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn native_tool_rejected_on_unknown_host() {
        let root = fixture_root();
        let resources = Resources::with_host(root.path(), None).unwrap();
        assert!(matches!(
            resources.aapt2(),
            Err(ToolchainError::UnsupportedHost { tool: "aapt2" })
        ));
        // Portable jars still resolve
        assert!(resources.dx().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn extracted_tools_are_executable() {
        use std::os::unix::fs::PermissionsExt;
        let root = fixture_root();
        let resources = Resources::with_host(root.path(), Some(HostOs::Linux)).unwrap();
        let aapt2 = resources.aapt2().unwrap();
        let mode = std::fs::metadata(&aapt2).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}
