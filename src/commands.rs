//! CLI commands
//!
//! Plain command structs so builds can be scripted without going
//! through the server surface.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde::Deserialize;
use tracing::info;

use blockforge_build_engine::{
    run_pipeline, ContextBuilder, LogReporter, Project, TargetPlatform,
};
use blockforge_toolchain::Resources;

/// Component usage exported alongside the project: which component
/// types the screens instantiate and which blocks each type uses.
#[derive(Debug, Default, Deserialize)]
struct ComponentUsage {
    #[serde(default)]
    types: BTreeSet<String>,
    #[serde(default)]
    blocks: HashMap<String, BTreeSet<String>>,
}

/// Build command options
pub struct BuildCommand {
    pub project_dir: PathBuf,
    pub target: TargetPlatform,
    pub companion: bool,
    pub emulator: bool,
    pub include_dangerous: bool,
    pub output: Option<String>,
    pub keystore: Option<PathBuf>,
    pub bundled: Option<PathBuf>,
}

impl BuildCommand {
    /// Runs the full pipeline for the selected target and returns the
    /// deploy artifact path.
    pub async fn execute(&self) -> anyhow::Result<PathBuf> {
        let project = Project::load(&self.project_dir)
            .with_context(|| format!("loading project at {:?}", self.project_dir))?;
        let usage = self.load_usage()?;
        if usage.types.is_empty() {
            bail!("project declares no component types (components.json)");
        }

        let bundled = self
            .bundled
            .clone()
            .unwrap_or_else(|| self.project_dir.join("bundled"));
        let resources = Resources::new(&bundled)
            .with_context(|| format!("opening bundled resources at {:?}", bundled))?;
        let keystore = self
            .keystore
            .clone()
            .unwrap_or_else(|| self.project_dir.join("android.keystore"));
        if !keystore.is_file() {
            bail!("keystore not found at {:?}", keystore);
        }

        info!(
            "building {} for {} ({} component types)",
            project.name,
            self.target.as_str(),
            usage.types.len()
        );

        let mut builder = ContextBuilder::default()
            .with_project(project)
            .with_types(usage.types)
            .with_blocks(usage.blocks)
            .with_reporter(Arc::new(LogReporter))
            .with_keystore(keystore)
            .with_resources(Arc::new(resources))
            .for_companion(self.companion)
            .for_emulator(self.emulator)
            .include_dangerous_permissions(self.include_dangerous);
        if let Some(name) = &self.output {
            builder = builder.with_output_file_name(name.clone());
        }
        let mut ctx = builder.build(self.target)?;

        let artifact = run_pipeline(&mut ctx).await?;
        Ok(artifact)
    }

    fn load_usage(&self) -> anyhow::Result<ComponentUsage> {
        let path = self.project_dir.join("components.json");
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading component usage at {:?}", path))?;
        let usage = serde_json::from_str(&raw)
            .with_context(|| format!("parsing component usage at {:?}", path))?;
        Ok(usage)
    }
}

/// Parses a `--target` value.
pub fn parse_target(value: &str) -> anyhow::Result<TargetPlatform> {
    match value {
        "apk" => Ok(TargetPlatform::Apk),
        "aab" => Ok(TargetPlatform::Aab),
        "ipa" | "ios" => Ok(TargetPlatform::Ios),
        other => bail!("unknown target {:?} (expected apk, aab or ipa)", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_parsing() {
        assert_eq!(parse_target("apk").unwrap(), TargetPlatform::Apk);
        assert_eq!(parse_target("aab").unwrap(), TargetPlatform::Aab);
        assert_eq!(parse_target("ipa").unwrap(), TargetPlatform::Ios);
        assert!(parse_target("exe").is_err());
    }

    #[test]
    fn usage_file_defaults() {
        let usage: ComponentUsage = serde_json::from_str("{}").unwrap();
        assert!(usage.types.is_empty());
        assert!(usage.blocks.is_empty());

        let usage: ComponentUsage = serde_json::from_str(
            r#"{"types": ["com.blockforge.components.runtime.Texting"],
                "blocks": {"Texting": ["SendMessage"]}}"#,
        )
        .unwrap();
        assert_eq!(usage.types.len(), 1);
        assert_eq!(usage.blocks["Texting"].len(), 1);
    }
}
