//! Host Platform Table
//!
//! Maps (host OS, tool) to the relative path of the bundled executable,
//! built once from compile-time platform information instead of repeated
//! OS-name string comparisons.

/// Supported host operating systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOs {
    Linux,
    MacOs,
    Windows,
}

impl HostOs {
    /// Detect the host OS. `None` means no bundled native tools exist
    /// for this platform and the build must be rejected.
    pub fn detect() -> Option<Self> {
        match std::env::consts::OS {
            "linux" => Some(HostOs::Linux),
            "macos" => Some(HostOs::MacOs),
            "windows" => Some(HostOs::Windows),
            _ => None,
        }
    }

    /// Directory name under `tools/` holding this host's native binaries.
    pub fn tools_dir(&self) -> &'static str {
        match self {
            HostOs::Linux => "linux",
            HostOs::MacOs => "mac",
            HostOs::Windows => "windows",
        }
    }

    fn exe_suffix(&self) -> &'static str {
        match self {
            HostOs::Windows => ".exe",
            _ => "",
        }
    }
}

/// External build tools shipped with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Legacy resource packager (native, per-OS)
    Aapt,
    /// Resource packager with protobuf output (native, per-OS)
    Aapt2,
    /// APK alignment tool (native, per-OS)
    Zipalign,
    /// APK signer (portable jar)
    Apksigner,
    /// DEX compiler/merger (portable jar)
    Dx,
    /// AAB assembler (portable jar)
    Bundletool,
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Aapt => "aapt",
            Tool::Aapt2 => "aapt2",
            Tool::Zipalign => "zipalign",
            Tool::Apksigner => "apksigner",
            Tool::Dx => "dx",
            Tool::Bundletool => "bundletool",
        }
    }

    /// Relative path of the bundled tool for the given host.
    /// `None` when the tool has no binary for that host.
    pub fn relative_path(&self, host: Option<HostOs>) -> Option<String> {
        match self {
            // Portable jars are host-independent
            Tool::Apksigner => Some("tools/apksigner.jar".to_string()),
            Tool::Dx => Some("tools/dx.jar".to_string()),
            Tool::Bundletool => Some("tools/bundletool.jar".to_string()),
            // Native binaries need a known host
            Tool::Aapt | Tool::Aapt2 | Tool::Zipalign => {
                let host = host?;
                Some(format!(
                    "tools/{}/{}{}",
                    host.tools_dir(),
                    self.name(),
                    host.exe_suffix()
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_tool_paths_follow_host_dir() {
        assert_eq!(
            Tool::Aapt2.relative_path(Some(HostOs::Linux)).unwrap(),
            "tools/linux/aapt2"
        );
        assert_eq!(
            Tool::Zipalign.relative_path(Some(HostOs::Windows)).unwrap(),
            "tools/windows/zipalign.exe"
        );
    }

    #[test]
    fn native_tools_unavailable_without_host() {
        assert!(Tool::Aapt.relative_path(None).is_none());
    }

    #[test]
    fn jars_are_host_independent() {
        assert_eq!(
            Tool::Bundletool.relative_path(None).unwrap(),
            "tools/bundletool.jar"
        );
    }
}
