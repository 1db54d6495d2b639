//! Blockforge Component Model
//!
//! Declarative per-component build metadata: the JSON wire contract
//! produced by the component annotation compiler, the accumulated
//! per-type manifest-artifact sets, and the block-gated conditional
//! merge that decides what a packaged project actually needs.

pub mod build_info;
pub mod info;
pub mod loader;

pub use build_info::{parse_build_info, Category, ComponentBuildInfo};
pub use info::ComponentInfo;
pub use loader::ComponentInfoLoader;

/// Component metadata errors
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    #[error("malformed component build info: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fully-qualified type of the WebViewer runtime component. Receives the
/// forced location permissions when the project enables location use.
pub const WEB_VIEWER_TYPE: &str = "com.blockforge.components.runtime.WebViewer";

/// Permissions forced onto WebViewer by the project-level location setting.
pub const LOCATION_PERMISSIONS: [&str; 3] = [
    "android.permission.ACCESS_FINE_LOCATION",
    "android.permission.ACCESS_COARSE_LOCATION",
    "android.permission.ACCESS_MOCK_LOCATION",
];

/// Permissions stripped from companion builds unless explicitly allowed.
pub const DANGEROUS_PERMISSIONS: [&str; 6] = [
    "android.permission.READ_CONTACTS",
    "android.permission.WRITE_CONTACTS",
    "android.permission.READ_CALL_LOG",
    "android.permission.SEND_SMS",
    "android.permission.RECEIVE_SMS",
    "android.permission.READ_SMS",
];

/// Strip package qualification; block definitions use unqualified names.
pub fn unqualified_name(component_type: &str) -> &str {
    component_type.rsplit('.').next().unwrap_or(component_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unqualified_name_strips_package() {
        assert_eq!(unqualified_name("com.blockforge.components.runtime.Camera"), "Camera");
        assert_eq!(unqualified_name("Camera"), "Camera");
    }
}
