//! Pipeline Driver
//!
//! Each build target owns an ordered stage list; the driver runs the
//! stages sequentially against the shared context, reporting progress
//! and short-circuiting on the first failure. The stage lists are plain
//! data so adding a target means adding a list, not a subclass.

use std::path::PathBuf;

use tracing::debug;

use crate::context::CompilerContext;
use crate::tasks;
use crate::{BuildError, TargetPlatform};

/// One step of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ReadBuildInfo,
    LoadComponentInfo,
    GenerateManifest,
    MergeResources,
    PackageResources,
    RunMultidex,
    RunApkBuilder,
    RunZipAlign,
    RunApkSigner,
    RunBundletool,
    CreatePayload,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::ReadBuildInfo => "read build info",
            Stage::LoadComponentInfo => "load component info",
            Stage::GenerateManifest => "generate manifest",
            Stage::MergeResources => "merge resources",
            Stage::PackageResources => "package resources",
            Stage::RunMultidex => "multidex",
            Stage::RunApkBuilder => "seal apk",
            Stage::RunZipAlign => "zipalign",
            Stage::RunApkSigner => "sign apk",
            Stage::RunBundletool => "bundletool",
            Stage::CreatePayload => "create payload",
        }
    }

    async fn run(&self, ctx: &mut CompilerContext) -> Result<(), BuildError> {
        match self {
            Stage::ReadBuildInfo => tasks::read_build_info::read_build_info(ctx).await,
            Stage::LoadComponentInfo => {
                tasks::load_component_info::load_component_info(ctx).await
            }
            Stage::GenerateManifest => tasks::manifest::generate_manifest(ctx).await,
            Stage::MergeResources => tasks::merge_resources::merge_resources(ctx).await,
            Stage::PackageResources => {
                tasks::package_resources::package_resources(ctx).await
            }
            Stage::RunMultidex => tasks::multidex::run_multidex(ctx).await,
            Stage::RunApkBuilder => tasks::apk_builder::run_apk_builder(ctx).await,
            Stage::RunZipAlign => tasks::zipalign::run_zipalign(ctx).await,
            Stage::RunApkSigner => tasks::sign::run_apk_signer(ctx).await,
            Stage::RunBundletool => tasks::bundletool::run_bundletool(ctx).await,
            Stage::CreatePayload => tasks::payload::create_payload(ctx).await,
        }
    }
}

/// Ordered stage list for a target.
pub fn stages(target: TargetPlatform) -> Vec<Stage> {
    match target {
        TargetPlatform::Apk => vec![
            Stage::ReadBuildInfo,
            Stage::LoadComponentInfo,
            Stage::GenerateManifest,
            Stage::MergeResources,
            Stage::PackageResources,
            Stage::RunMultidex,
            Stage::RunApkBuilder,
            Stage::RunZipAlign,
            Stage::RunApkSigner,
        ],
        TargetPlatform::Aab => vec![
            Stage::ReadBuildInfo,
            Stage::LoadComponentInfo,
            Stage::GenerateManifest,
            Stage::MergeResources,
            Stage::PackageResources,
            Stage::RunMultidex,
            Stage::RunBundletool,
        ],
        TargetPlatform::Ios => vec![
            Stage::ReadBuildInfo,
            Stage::LoadComponentInfo,
            Stage::CreatePayload,
        ],
    }
}

/// Runs the stage list for the context's target. Returns the deploy
/// artifact path on success; the first failing stage aborts the build
/// after being reported.
pub async fn run_pipeline(ctx: &mut CompilerContext) -> Result<PathBuf, BuildError> {
    let reporter = ctx.reporter().clone();
    for stage in stages(ctx.target()) {
        reporter.stage(stage.name());
        debug!("running stage {:?}", stage);
        if let Err(err) = stage.run(ctx).await {
            reporter.error(stage.name(), &err.to_string());
            return Err(err);
        }
    }
    let artifact = ctx.deploy_file();
    reporter.done(&artifact);
    Ok(artifact)
}
