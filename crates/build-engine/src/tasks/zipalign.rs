//! RunZipAlign
//!
//! Aligns the sealed APK to a 4-byte boundary via the external
//! `zipalign` tool into a temp file, then replaces the deploy artifact
//! with the aligned result. A non-zero exit from the tool fails the
//! task; the pipeline halts rather than shipping an unaligned APK.

use std::path::Path;

use tokio::process::Command;
use tracing::info;

use crate::context::CompilerContext;
use crate::tasks::run_tool;
use crate::BuildError;

pub async fn run_zipalign(ctx: &mut CompilerContext) -> Result<(), BuildError> {
    let zipalign = ctx.resources().zipalign()?;
    let deploy = ctx.deploy_file();
    let aligned = ctx.paths().tmp_dir().join("aligned.apk");

    align(&zipalign, &deploy, &aligned).await?;

    std::fs::rename(&aligned, &deploy)?;
    info!("aligned {:?}", deploy);
    Ok(())
}

async fn align(tool: &Path, input: &Path, output: &Path) -> Result<(), BuildError> {
    let mut cmd = Command::new(tool);
    cmd.arg("-f").arg("4").arg(input).arg(output);
    run_tool("zipalign", &mut cmd).await
}
