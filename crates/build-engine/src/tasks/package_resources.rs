//! PackageResources
//!
//! Invokes the resource packager over the generated manifest, merged
//! resources, and staged assets (the project's own plus every asset
//! the used components declare), producing the temp package the later
//! sealing tasks consume. APK targets use classic `aapt package`; AAB
//! targets use `aapt2 compile` + `aapt2 link --proto-format`, since
//! bundletool only accepts protobuf-encoded resources.

use std::path::PathBuf;

use tokio::process::Command;
use tracing::info;

use blockforge_components::Category;

use crate::context::CompilerContext;
use crate::tasks::{copy_tree, run_tool};
use crate::{BuildError, TargetPlatform};

pub async fn package_resources(ctx: &mut CompilerContext) -> Result<(), BuildError> {
    let android = ctx
        .paths()
        .android()
        .ok_or_else(|| BuildError::Config("resource packaging requires an Android target".into()))?;

    let manifest = ctx.paths().manifest_file();
    let merged_res = android.merged_res_dir().to_path_buf();
    let temp_package = ctx.paths().temp_package();
    let include_jar = ctx.resources().android_runtime_jar()?;
    let staged_assets = stage_assets(ctx)?;

    match ctx.target() {
        TargetPlatform::Apk => {
            let aapt = ctx.resources().aapt()?;
            let mut cmd = Command::new(&aapt);
            cmd.arg("package")
                .arg("-f")
                .arg("-M")
                .arg(&manifest)
                .arg("-S")
                .arg(&merged_res)
                .arg("-I")
                .arg(&include_jar)
                .arg("-F")
                .arg(&temp_package);
            if let Some(assets) = &staged_assets {
                cmd.arg("-A").arg(assets);
            }
            run_tool("aapt", &mut cmd).await?;
        }
        TargetPlatform::Aab => {
            let aapt2 = ctx.resources().aapt2()?;
            let compiled = ctx.paths().tmp_dir().join("res.zip");

            let mut compile = Command::new(&aapt2);
            compile
                .arg("compile")
                .arg("--dir")
                .arg(&merged_res)
                .arg("-o")
                .arg(&compiled);
            run_tool("aapt2", &mut compile).await?;

            let mut link = Command::new(&aapt2);
            link.arg("link")
                .arg("--proto-format")
                .arg("--auto-add-overlay")
                .arg("--manifest")
                .arg(&manifest)
                .arg("-I")
                .arg(&include_jar)
                .arg("-o")
                .arg(&temp_package)
                .arg(&compiled);
            if let Some(assets) = &staged_assets {
                link.arg("-A").arg(assets);
            }
            run_tool("aapt2", &mut link).await?;
        }
        TargetPlatform::Ios => {
            return Err(BuildError::Config("resource packaging requires an Android target".into()))
        }
    }

    if !temp_package.is_file() {
        return Err(BuildError::MissingOutput(format!("{:?}", temp_package)));
    }
    info!("packaged resources into {:?}", temp_package);
    Ok(())
}

/// Collects the project's own assets and every asset the used
/// components declare into the build assets directory. Component
/// assets ship in the bundled tree under `assets/`. `None` when there
/// is nothing to package.
fn stage_assets(ctx: &CompilerContext) -> Result<Option<PathBuf>, BuildError> {
    let staged = ctx.paths().assets_dir().to_path_buf();
    let mut populated = false;

    if let Some(project) = ctx.project() {
        let assets = project.assets_dir();
        if assets.is_dir() {
            copy_tree(&assets, &staged)?;
            populated = true;
        }
    }

    for asset in ctx.component_info().all_values(Category::Assets) {
        let source = ctx.resources().resource(&format!("assets/{}", asset))?;
        let target = staged.join(&asset);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&source, &target)?;
        populated = true;
    }

    Ok(populated.then_some(staged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::LogReporter;
    use crate::{Project, TargetPlatform};
    use blockforge_toolchain::Resources;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Arc;

    #[test]
    fn component_assets_staged_next_to_project_assets() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let bundled = root.join("bundled");
        std::fs::create_dir_all(bundled.join("assets")).unwrap();
        std::fs::write(bundled.join("assets/gauge_face.png"), b"png").unwrap();

        let project_dir = root.join("project");
        std::fs::create_dir_all(project_dir.join("assets")).unwrap();
        std::fs::write(
            project_dir.join("project.toml"),
            "name = \"App\"\npackage = \"com.example.app\"\n",
        )
        .unwrap();
        std::fs::write(project_dir.join("assets/logo.png"), b"logo").unwrap();

        let ctx = CompilerContext::builder()
            .with_project(Project::load(&project_dir).unwrap())
            .with_types(BTreeSet::new())
            .with_blocks(HashMap::new())
            .with_reporter(Arc::new(LogReporter))
            .with_keystore(root.join("android.keystore"))
            .with_resources(Arc::new(Resources::new(&bundled).unwrap()))
            .build(TargetPlatform::Apk)
            .unwrap();
        ctx.component_info()
            .merge_into(Category::Assets, "a.b.Gauge", ["gauge_face.png"]);

        let staged = stage_assets(&ctx).unwrap().unwrap();
        assert!(staged.join("logo.png").is_file());
        assert!(staged.join("gauge_face.png").is_file());
    }

    #[test]
    fn nothing_to_stage_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = CompilerContext::builder()
            .with_types(BTreeSet::new())
            .with_blocks(HashMap::new())
            .with_reporter(Arc::new(LogReporter))
            .with_keystore(dir.path().join("android.keystore"))
            .with_resources(Arc::new(Resources::new(dir.path().join("bundled")).unwrap()))
            .with_build_dir(dir.path().join("build"))
            .build(TargetPlatform::Apk)
            .unwrap();

        assert!(stage_assets(&ctx).unwrap().is_none());
    }
}
