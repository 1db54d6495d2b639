//! Blockforge Build Engine
//!
//! Turns a visual block project into an installable app package by
//! driving an ordered chain of fallible build tasks against a shared
//! compiler context: component metadata loading, conditional manifest
//! merging, resource packaging, dexing, sealing, signing, and bundling.

pub mod context;
pub mod paths;
pub mod pipeline;
pub mod project;
pub mod reporter;
pub mod tasks;

pub use context::{CompilerContext, ContextBuilder};
pub use paths::{AndroidPaths, BuildPaths, IosPaths, PlatformPaths};
pub use pipeline::{run_pipeline, stages, Stage};
pub use project::Project;
pub use reporter::{BuildReporter, LogReporter};

use blockforge_components::ComponentError;
use blockforge_toolchain::ToolchainError;

/// Build errors
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("build configuration error: {0}")]
    Config(String),
    #[error("{tool} failed: {message}")]
    ToolFailed { tool: &'static str, message: String },
    #[error("expected build output missing: {0}")]
    MissingOutput(String),
    #[error(transparent)]
    Toolchain(#[from] ToolchainError),
    #[error(transparent)]
    Component(#[from] ComponentError),
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("manifest write error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build target platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetPlatform {
    /// Installable Android package
    Apk,
    /// Android App Bundle (publishing format)
    Aab,
    /// iOS application payload
    Ios,
}

impl TargetPlatform {
    pub fn extension(&self) -> &'static str {
        match self {
            TargetPlatform::Apk => "apk",
            TargetPlatform::Aab => "aab",
            TargetPlatform::Ios => "ipa",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetPlatform::Apk => "apk",
            TargetPlatform::Aab => "aab",
            TargetPlatform::Ios => "ios",
        }
    }
}
