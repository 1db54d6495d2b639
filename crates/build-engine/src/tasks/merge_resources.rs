//! MergeResources
//!
//! Collects Android resources from exploded AAR dependencies and the
//! project into the merged-res directory. Sources are copied in
//! dependency-first order so project files win every conflict.
//! Component-declared xml resources (packed as `name:content`) are
//! written into the merged `xml/` directory afterwards.

use tracing::{debug, warn};

use blockforge_components::Category;

use crate::context::CompilerContext;
use crate::tasks::copy_tree;
use crate::BuildError;

pub async fn merge_resources(ctx: &mut CompilerContext) -> Result<(), BuildError> {
    let android = ctx
        .paths()
        .android()
        .ok_or_else(|| BuildError::Config("resource merging requires an Android target".into()))?;
    let merged = android.merged_res_dir().to_path_buf();

    for dir in ctx.component_info().exploded_res_dirs() {
        if !dir.is_dir() {
            warn!("skipping missing AAR res dir {:?}", dir);
            continue;
        }
        debug!("merging {:?}", dir);
        copy_tree(&dir, &merged)?;
    }

    if let Some(project) = ctx.project() {
        let project_res = project.res_dir();
        if project_res.is_dir() {
            // Last writer: project resources override library ones
            copy_tree(&project_res, &merged)?;
        }
    }

    let xml_dir = merged.join("xml");
    for entry in ctx.component_info().all_values(Category::Xmls) {
        let Some((name, content)) = entry.split_once(':') else {
            warn!("skipping malformed xml declaration {:?}", entry);
            continue;
        };
        std::fs::create_dir_all(&xml_dir)?;
        std::fs::write(xml_dir.join(format!("{}.xml", name)), content)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::LogReporter;
    use crate::{Project, TargetPlatform};
    use blockforge_toolchain::Resources;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Arc;

    #[tokio::test]
    async fn project_resources_override_library_resources() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let aar_res = root.join("aar/res");
        std::fs::create_dir_all(aar_res.join("values")).unwrap();
        std::fs::write(aar_res.join("values/colors.xml"), "<resources>lib</resources>").unwrap();
        std::fs::write(aar_res.join("values/strings.xml"), "<resources/>").unwrap();

        let project_dir = root.join("project");
        std::fs::create_dir_all(project_dir.join("res/values")).unwrap();
        std::fs::write(
            project_dir.join("project.toml"),
            "name = \"App\"\npackage = \"com.example.app\"\n",
        )
        .unwrap();
        std::fs::write(
            project_dir.join("res/values/colors.xml"),
            "<resources>project</resources>",
        )
        .unwrap();

        let mut ctx = CompilerContext::builder()
            .with_project(Project::load(&project_dir).unwrap())
            .with_types(BTreeSet::new())
            .with_blocks(HashMap::new())
            .with_reporter(Arc::new(LogReporter))
            .with_keystore(root.join("android.keystore"))
            .with_resources(Arc::new(Resources::new(root.join("tools")).unwrap()))
            .build(TargetPlatform::Apk)
            .unwrap();
        ctx.component_info().add_exploded_res_dir(aar_res);

        merge_resources(&mut ctx).await.unwrap();

        let merged = ctx.paths().android().unwrap().merged_res_dir().to_path_buf();
        let colors = std::fs::read_to_string(merged.join("values/colors.xml")).unwrap();
        assert_eq!(colors, "<resources>project</resources>");
        assert!(merged.join("values/strings.xml").is_file());
    }

    #[tokio::test]
    async fn component_xml_declarations_land_in_res_xml() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = CompilerContext::builder()
            .with_types(BTreeSet::new())
            .with_blocks(HashMap::new())
            .with_reporter(Arc::new(LogReporter))
            .with_keystore(dir.path().join("android.keystore"))
            .with_resources(Arc::new(Resources::new(dir.path().join("tools")).unwrap()))
            .with_build_dir(dir.path().join("build"))
            .build(TargetPlatform::Apk)
            .unwrap();
        ctx.component_info().merge_into(
            Category::Xmls,
            "a.b.Web",
            ["network_security_config:<network-security-config/>"],
        );
        ctx.component_info()
            .merge_into(Category::Xmls, "a.b.Broken", ["no-separator"]);

        merge_resources(&mut ctx).await.unwrap();

        let xml_dir = ctx
            .paths()
            .android()
            .unwrap()
            .merged_res_dir()
            .join("xml");
        let written = std::fs::read_to_string(xml_dir.join("network_security_config.xml")).unwrap();
        assert_eq!(written, "<network-security-config/>");
        // Malformed declarations are skipped, not written
        assert_eq!(std::fs::read_dir(&xml_dir).unwrap().count(), 1);
    }
}
