//! Project Settings
//!
//! The designer-facing settings of a visual project, stored as
//! `project.toml` in the project root, plus the fixed source layout
//! (classes, res, assets, external components).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::BuildError;

/// Lowest Android API level the runtime supports.
pub const DEFAULT_MIN_SDK: u32 = 21;
/// API level packaged apps target by default.
pub const DEFAULT_TARGET_SDK: u32 = 34;

/// A visual block project on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Project name, used for the default output file name
    pub name: String,
    /// Application package (manifest `package` attribute)
    pub package: String,
    #[serde(default = "default_version_code")]
    pub version_code: u32,
    #[serde(default = "default_version_name")]
    pub version_name: String,
    /// Launcher label; falls back to the project name
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub min_sdk: Option<u32>,
    #[serde(default = "default_target_sdk")]
    pub target_sdk: u32,
    /// Project-level "uses location" designer setting; forces the
    /// location permissions onto WebViewer regardless of block usage.
    #[serde(default)]
    pub uses_location: bool,
    /// ABIs to package native libraries for
    #[serde(default = "default_abis")]
    pub abis: Vec<String>,

    /// Project root directory (set at load time, not serialized)
    #[serde(skip)]
    pub root: PathBuf,
}

fn default_version_code() -> u32 {
    1
}

fn default_version_name() -> String {
    "1.0".to_string()
}

fn default_target_sdk() -> u32 {
    DEFAULT_TARGET_SDK
}

fn default_abis() -> Vec<String> {
    vec!["armeabi-v7a".to_string(), "arm64-v8a".to_string(), "x86_64".to_string()]
}

impl Project {
    /// Load `project.toml` from a project directory.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, BuildError> {
        let root = root.as_ref();
        let settings = root.join("project.toml");
        let content = std::fs::read_to_string(&settings).map_err(|e| {
            BuildError::Config(format!("cannot read {}: {}", settings.display(), e))
        })?;
        let mut project: Project = toml::from_str(&content)
            .map_err(|e| BuildError::Config(format!("invalid project settings: {}", e)))?;
        project.root = root.to_path_buf();
        info!("loaded project {} ({})", project.name, project.package);
        Ok(project)
    }

    pub fn label(&self) -> &str {
        self.app_name.as_deref().unwrap_or(&self.name)
    }

    /// Compiled screen classes produced by the blocks compiler.
    pub fn classes_dir(&self) -> PathBuf {
        self.root.join("classes")
    }

    pub fn res_dir(&self) -> PathBuf {
        self.root.join("res")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    /// Per-type extension directories, each holding the extension's
    /// build-info JSON and runtime jar.
    pub fn external_comps_dir(&self) -> PathBuf {
        self.root.join("assets").join("external_comps")
    }

    /// Name of the first screen; doubles as the launcher activity.
    pub fn main_activity(&self) -> String {
        format!("{}.Screen1", self.package)
    }
}
