//! Blockforge
//!
//! Server-side build pipeline for a visual block-programming IDE. A
//! project (component instances plus block usage) is compiled into an
//! installable Android APK, an Android App Bundle, or an iOS payload
//! by merging per-component declarative metadata and driving a chain
//! of external packaging tools.
//!
//! The work is split across focused crates:
//!
//! - `blockforge-toolchain`: host detection and bundled tool/asset
//!   extraction
//! - `blockforge-components`: component build metadata and the
//!   conditional merge that decides what a build actually needs
//! - `blockforge-build-engine`: the compiler context, paths, tasks and
//!   the per-target pipeline driver

pub use blockforge_build_engine as build_engine;
pub use blockforge_components as components;
pub use blockforge_toolchain as toolchain;

pub mod commands;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
