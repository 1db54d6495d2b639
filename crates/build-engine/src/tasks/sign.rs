//! RunApkSigner
//!
//! Signs the aligned APK with `apksigner` using the project keystore
//! and the fixed shared-signing convention (`AndroidKey` / `android`).
//! The signer runs under a RAM ceiling derived from the configured
//! child-process budget minus a fixed reservation. Like zipalign, a
//! failing signer fails the build.

use std::path::Path;

use tracing::info;

use crate::context::{CompilerContext, SIGNER_RAM_RESERVE_MB};
use crate::tasks::{java_jar_cmd, run_tool};
use crate::BuildError;

/// Key alias and passphrase of the shared debug-style signing flow.
pub const KEY_ALIAS: &str = "AndroidKey";
pub const KEY_PASS: &str = "android";

pub async fn run_apk_signer(ctx: &mut CompilerContext) -> Result<(), BuildError> {
    let apksigner = ctx.resources().apksigner()?;
    let ram_mb = ctx.child_ram_mb().saturating_sub(SIGNER_RAM_RESERVE_MB).max(1);
    let deploy = ctx.deploy_file();

    sign(&apksigner, ram_mb, ctx.keystore_path(), &deploy).await?;
    info!("signed {:?}", deploy);
    Ok(())
}

async fn sign(
    apksigner: &Path,
    ram_mb: u32,
    keystore: &Path,
    apk: &Path,
) -> Result<(), BuildError> {
    let mut cmd = java_jar_cmd(apksigner, ram_mb);
    cmd.arg("sign")
        .arg("-ks")
        .arg(keystore)
        .arg("-ks-key-alias")
        .arg(KEY_ALIAS)
        .arg("-ks-pass")
        .arg(format!("pass:{}", KEY_PASS))
        .arg(apk);
    run_tool("apksigner", &mut cmd).await
}
