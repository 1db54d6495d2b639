//! Blockforge Toolchain
//!
//! Resolves the external build tools (aapt2, dx, apksigner, zipalign,
//! bundletool, jarsigner) bundled with the build server, and extracts
//! bundled runtime resources to executable temp files on first use.

pub mod host;
pub mod resources;

pub use host::{HostOs, Tool};
pub use resources::Resources;

/// Toolchain errors
#[derive(Debug, thiserror::Error)]
pub enum ToolchainError {
    #[error("no {tool} available for this host platform")]
    UnsupportedHost { tool: &'static str },
    #[error("bundled resource not found: {0}")]
    ResourceNotFound(String),
    #[error("jarsigner not found on PATH or under JAVA_HOME")]
    JarsignerNotFound,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
