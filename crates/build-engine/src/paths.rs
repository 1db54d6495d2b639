//! Build Directory Layout
//!
//! On-disk locations used during a build. The shared set is common to
//! every target; Android and iOS targets extend it with platform-only
//! locations.

use std::io;
use std::path::{Path, PathBuf};

use crate::TargetPlatform;

/// Android-only build locations.
#[derive(Debug, Clone)]
pub struct AndroidPaths {
    drawable_dir: PathBuf,
    merged_res_dir: PathBuf,
    libs_dir: PathBuf,
    aab_dir: PathBuf,
}

impl AndroidPaths {
    pub fn drawable_dir(&self) -> &Path {
        &self.drawable_dir
    }

    pub fn merged_res_dir(&self) -> &Path {
        &self.merged_res_dir
    }

    pub fn libs_dir(&self) -> &Path {
        &self.libs_dir
    }

    /// Root of the AAB module staging tree.
    pub fn aab_dir(&self) -> &Path {
        &self.aab_dir
    }

    pub fn aab_manifest_dir(&self) -> PathBuf {
        self.aab_dir.join("manifest")
    }

    pub fn aab_res_dir(&self) -> PathBuf {
        self.aab_dir.join("res")
    }

    pub fn aab_assets_dir(&self) -> PathBuf {
        self.aab_dir.join("assets")
    }

    pub fn aab_dex_dir(&self) -> PathBuf {
        self.aab_dir.join("dex")
    }

    pub fn aab_lib_dir(&self) -> PathBuf {
        self.aab_dir.join("lib")
    }
}

/// iOS-only build locations.
#[derive(Debug, Clone)]
pub struct IosPaths {
    payload_dir: PathBuf,
    framework_dir: PathBuf,
}

impl IosPaths {
    pub fn payload_dir(&self) -> &Path {
        &self.payload_dir
    }

    pub fn framework_dir(&self) -> &Path {
        &self.framework_dir
    }
}

/// Platform extension of the shared layout.
#[derive(Debug, Clone)]
pub enum PlatformPaths {
    Android(AndroidPaths),
    Ios(IosPaths),
}

/// All on-disk locations for one build invocation.
#[derive(Debug, Clone)]
pub struct BuildPaths {
    build_dir: PathBuf,
    deploy_dir: PathBuf,
    res_dir: PathBuf,
    assets_dir: PathBuf,
    tmp_dir: PathBuf,
    classes_dir: PathBuf,
    platform: PlatformPaths,
}

impl BuildPaths {
    /// Lay out the tree for a target under the given build directory.
    pub fn for_target(build_dir: impl Into<PathBuf>, target: TargetPlatform) -> Self {
        let build_dir = build_dir.into();
        let platform = match target {
            TargetPlatform::Apk | TargetPlatform::Aab => PlatformPaths::Android(AndroidPaths {
                drawable_dir: build_dir.join("res").join("drawable"),
                merged_res_dir: build_dir.join("intermediates").join("res").join("merged"),
                libs_dir: build_dir.join("libs"),
                aab_dir: build_dir.join("aab"),
            }),
            TargetPlatform::Ios => PlatformPaths::Ios(IosPaths {
                payload_dir: build_dir.join("Payload"),
                framework_dir: build_dir.join("Frameworks"),
            }),
        };
        Self {
            deploy_dir: build_dir.join("deploy"),
            res_dir: build_dir.join("res"),
            assets_dir: build_dir.join("assets"),
            tmp_dir: build_dir.join("tmp"),
            classes_dir: build_dir.join("classes"),
            build_dir,
            platform,
        }
    }

    /// Create the whole tree. Idempotent.
    pub fn mkdirs(&self) -> io::Result<()> {
        for dir in [
            &self.build_dir,
            &self.deploy_dir,
            &self.res_dir,
            &self.assets_dir,
            &self.tmp_dir,
            &self.classes_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        match &self.platform {
            PlatformPaths::Android(android) => {
                std::fs::create_dir_all(&android.drawable_dir)?;
                std::fs::create_dir_all(&android.merged_res_dir)?;
                std::fs::create_dir_all(&android.libs_dir)?;
                for dir in [
                    android.aab_manifest_dir(),
                    android.aab_res_dir(),
                    android.aab_assets_dir(),
                    android.aab_dex_dir(),
                    android.aab_lib_dir(),
                ] {
                    std::fs::create_dir_all(dir)?;
                }
            }
            PlatformPaths::Ios(ios) => {
                std::fs::create_dir_all(&ios.payload_dir)?;
                std::fs::create_dir_all(&ios.framework_dir)?;
            }
        }
        Ok(())
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn deploy_dir(&self) -> &Path {
        &self.deploy_dir
    }

    pub fn res_dir(&self) -> &Path {
        &self.res_dir
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    pub fn classes_dir(&self) -> &Path {
        &self.classes_dir
    }

    pub fn platform(&self) -> &PlatformPaths {
        &self.platform
    }

    /// Generated AndroidManifest.xml location.
    pub fn manifest_file(&self) -> PathBuf {
        self.build_dir.join("AndroidManifest.xml")
    }

    /// The aapt/aapt2 temp package (resources + manifest).
    pub fn temp_package(&self) -> PathBuf {
        self.tmp_dir.join("package.ap_")
    }

    pub fn android(&self) -> Option<&AndroidPaths> {
        match &self.platform {
            PlatformPaths::Android(android) => Some(android),
            PlatformPaths::Ios(_) => None,
        }
    }

    pub fn ios(&self) -> Option<&IosPaths> {
        match &self.platform {
            PlatformPaths::Ios(ios) => Some(ios),
            PlatformPaths::Android(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn android_layout_under_build_dir() {
        let paths = BuildPaths::for_target("/work/b1", TargetPlatform::Apk);
        assert_eq!(paths.deploy_dir(), Path::new("/work/b1/deploy"));
        let android = paths.android().unwrap();
        assert_eq!(
            android.merged_res_dir(),
            Path::new("/work/b1/intermediates/res/merged")
        );
        assert_eq!(android.aab_dex_dir(), Path::new("/work/b1/aab/dex"));
        assert!(paths.ios().is_none());
    }

    #[test]
    fn ios_layout_has_payload_tree() {
        let paths = BuildPaths::for_target("/work/b2", TargetPlatform::Ios);
        let ios = paths.ios().unwrap();
        assert_eq!(ios.payload_dir(), Path::new("/work/b2/Payload"));
        assert!(paths.android().is_none());
    }

    #[test]
    fn mkdirs_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let paths = BuildPaths::for_target(dir.path().join("build"), TargetPlatform::Aab);
        paths.mkdirs().unwrap();
        paths.mkdirs().unwrap();
        assert!(paths.android().unwrap().aab_manifest_dir().is_dir());
        assert!(paths.tmp_dir().is_dir());
    }
}
