//! ReadBuildInfo
//!
//! Loads the per-component build-info JSON of every built-in component
//! and every extension the project uses, splits the project's used
//! types into built-in vs extension sets, and caches each extension's
//! on-disk location.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use tracing::{debug, info};

use blockforge_components::{parse_build_info, ComponentBuildInfo};

use crate::context::CompilerContext;
use crate::BuildError;

pub async fn read_build_info(ctx: &mut CompilerContext) -> Result<(), BuildError> {
    let simple_path = ctx.resources().simple_components_json()?;
    let simple_json = std::fs::read_to_string(&simple_path)?;
    let simple_infos = parse_build_info(&simple_json)?;
    debug!("loaded {} built-in component descriptors", simple_infos.len());

    let declared: BTreeSet<&str> = simple_infos
        .iter()
        .map(|i| i.component_type.as_str())
        .collect();

    let mut simple_types = BTreeSet::new();
    let mut ext_types = BTreeSet::new();
    for used in ctx.comp_types() {
        if declared.contains(used.as_str()) {
            simple_types.insert(used.clone());
        } else {
            ext_types.insert(used.clone());
        }
    }

    let mut ext_infos: Vec<ComponentBuildInfo> = Vec::new();
    let mut ext_paths: HashMap<String, PathBuf> = HashMap::new();
    for ext_type in &ext_types {
        let (dir, infos) = load_extension_info(ctx, ext_type)?;
        ext_paths.insert(ext_type.clone(), dir);
        ext_infos.extend(infos);
    }

    info!(
        "project uses {} built-in and {} extension component types",
        simple_types.len(),
        ext_types.len()
    );

    let mut combined = simple_infos;
    combined.extend(ext_infos);
    ctx.set_build_info(combined, simple_types, ext_types, ext_paths);
    Ok(())
}

/// Locate and parse one extension's build info. Newer extensions ship a
/// `components.json` array; older ones a single-object `component.json`.
fn load_extension_info(
    ctx: &CompilerContext,
    ext_type: &str,
) -> Result<(PathBuf, Vec<ComponentBuildInfo>), BuildError> {
    let project = ctx.project().ok_or_else(|| {
        BuildError::Config(format!(
            "unknown component type {} (no project to resolve extensions from)",
            ext_type
        ))
    })?;

    let dir = project.external_comps_dir().join(ext_type);
    let multi = dir.join("components.json");
    if multi.is_file() {
        let infos = parse_build_info(&std::fs::read_to_string(&multi)?)?;
        return Ok((dir, infos));
    }

    let single = dir.join("component.json");
    if single.is_file() {
        let info: ComponentBuildInfo = serde_json::from_str(&std::fs::read_to_string(&single)?)?;
        return Ok((dir, vec![info]));
    }

    Err(BuildError::Config(format!(
        "unknown component type {} (no build info under {:?})",
        ext_type, dir
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::LogReporter;
    use crate::{Project, TargetPlatform};
    use blockforge_toolchain::Resources;
    use std::sync::Arc;

    const CAMERA: &str = "com.blockforge.components.runtime.Camera";
    const GAUGE: &str = "com.thirdparty.gauge.GaugeView";

    fn fixture() -> (tempfile::TempDir, CompilerContext) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        // Bundled resource tree
        std::fs::create_dir_all(root.join("res/components")).unwrap();
        std::fs::write(
            root.join("res/components/simple_components.json"),
            format!(r#"[{{"type": "{}", "permissions": ["android.permission.CAMERA"]}}]"#, CAMERA),
        )
        .unwrap();

        // Project with one extension
        let project_dir = root.join("project");
        let ext_dir = project_dir.join("assets/external_comps").join(GAUGE);
        std::fs::create_dir_all(&ext_dir).unwrap();
        std::fs::write(
            project_dir.join("project.toml"),
            "name = \"GaugeApp\"\npackage = \"com.example.gauge\"\n",
        )
        .unwrap();
        std::fs::write(
            ext_dir.join("components.json"),
            format!(r#"[{{"type": "{}", "libraries": ["gauge.jar"]}}]"#, GAUGE),
        )
        .unwrap();

        let project = Project::load(&project_dir).unwrap();
        let ctx = CompilerContext::builder()
            .with_project(project)
            .with_types([CAMERA.to_string(), GAUGE.to_string()].into())
            .with_blocks(HashMap::new())
            .with_reporter(Arc::new(LogReporter))
            .with_keystore(root.join("android.keystore"))
            .with_resources(Arc::new(Resources::new(root.join("res")).unwrap()))
            .build(TargetPlatform::Apk)
            .unwrap();
        (dir, ctx)
    }

    #[tokio::test]
    async fn splits_simple_and_extension_types() {
        let (_dir, mut ctx) = fixture();
        read_build_info(&mut ctx).await.unwrap();

        assert!(ctx.simple_comp_types().contains(CAMERA));
        assert!(ctx.ext_comp_types().contains(GAUGE));
        assert_eq!(ctx.build_info().len(), 2);
        assert!(ctx.ext_type_path(GAUGE).unwrap().ends_with(GAUGE));
    }

    #[tokio::test]
    async fn unknown_type_is_a_config_error() {
        let (_dir, mut ctx) = fixture();
        // Remove the extension's build info to make its type unresolvable
        let ext_dir = ctx.ext_type_path(GAUGE); // not yet populated
        assert!(ext_dir.is_none());
        let project_ext = ctx
            .project()
            .unwrap()
            .external_comps_dir()
            .join(GAUGE)
            .join("components.json");
        std::fs::remove_file(project_ext).unwrap();

        let result = read_build_info(&mut ctx).await;
        assert!(matches!(result, Err(BuildError::Config(_))));
    }
}
