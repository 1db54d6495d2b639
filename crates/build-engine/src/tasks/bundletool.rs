//! RunBundletool
//!
//! Assembles the Android App Bundle: relocates the produced DEX and
//! native-lib files into the AAB module skeleton, extracts the
//! protobuf-format resources from the aapt2 temp package, writes the
//! bundle config, zips the module, runs `bundletool build-bundle`, and
//! signs the result with `jarsigner`.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tokio::process::Command;
use tracing::{info, warn};
use zip::{write::FileOptions, ZipArchive, ZipWriter};

use crate::context::CompilerContext;
use crate::tasks::sign::{KEY_ALIAS, KEY_PASS};
use crate::tasks::{java_jar_cmd, run_tool};
use crate::BuildError;

/// File extensions stored uncompressed in the bundle; recompressing
/// media wastes install time for no size win.
const UNCOMPRESSED_GLOBS: [&str; 11] = [
    "**/*.png", "**/*.jpg", "**/*.jpeg", "**/*.gif", "**/*.webp", "**/*.mp3", "**/*.mp4",
    "**/*.ogg", "**/*.wav", "**/*.webm", "**/*.3gp",
];

pub async fn run_bundletool(ctx: &mut CompilerContext) -> Result<(), BuildError> {
    let android = ctx
        .paths()
        .android()
        .ok_or_else(|| BuildError::Config("bundletool requires an Android target".into()))?
        .clone();

    // (a) dex and native libs into the module skeleton
    let dex_dir = android.aab_dex_dir();
    for (index, dex) in ctx.dex_files().iter().enumerate() {
        let name = if index == 0 {
            "classes.dex".to_string()
        } else {
            format!("classes{}.dex", index + 1)
        };
        std::fs::copy(dex, dex_dir.join(name))?;
    }
    relocate_native_libs(ctx, &android.aab_lib_dir())?;

    // (b) protobuf resources out of the temp package
    extract_proto_package(&ctx.paths().temp_package(), &android)?;

    // (c) bundle config
    let config = serde_json::json!({
        "compression": {
            "uncompressedGlob": UNCOMPRESSED_GLOBS,
        }
    });
    let config_file = ctx.paths().tmp_dir().join("BundleConfig.json");
    std::fs::write(&config_file, serde_json::to_vec_pretty(&config)?)?;

    // (d) zip the module tree
    let module_zip = ctx.paths().tmp_dir().join("base.zip");
    zip_module(android.aab_dir(), &module_zip)?;

    // (e) build the bundle
    let deploy = ctx.deploy_file();
    if deploy.exists() {
        std::fs::remove_file(&deploy)?;
    }
    let bundletool = ctx.resources().bundletool()?;
    let mut cmd = java_jar_cmd(&bundletool, ctx.child_ram_mb());
    cmd.arg("build-bundle")
        .arg(format!("--modules={}", module_zip.display()))
        .arg(format!("--config={}", config_file.display()))
        .arg(format!("--output={}", deploy.display()));
    run_tool("bundletool", &mut cmd).await?;
    if !deploy.is_file() {
        return Err(BuildError::MissingOutput(format!("{:?}", deploy)));
    }

    // (f) sign the bundle
    let jarsigner = ctx.resources().jarsigner()?;
    let mut cmd = Command::new(&jarsigner);
    cmd.arg("-sigalg")
        .arg("SHA256withRSA")
        .arg("-digestalg")
        .arg("SHA-256")
        .arg("-keystore")
        .arg(ctx.keystore_path())
        .arg("-storepass")
        .arg(KEY_PASS)
        .arg(&deploy)
        .arg(KEY_ALIAS);
    run_tool("jarsigner", &mut cmd).await?;

    info!("bundled and signed {:?}", deploy);
    Ok(())
}

fn relocate_native_libs(ctx: &CompilerContext, lib_dir: &Path) -> Result<(), BuildError> {
    let native_libs = ctx
        .component_info()
        .all_values(blockforge_components::Category::NativeLibraries);
    if native_libs.is_empty() {
        return Ok(());
    }
    let abis = ctx
        .project()
        .map(|p| p.abis.clone())
        .unwrap_or_else(|| vec!["armeabi-v7a".to_string(), "arm64-v8a".to_string()]);
    for lib in &native_libs {
        for abi in &abis {
            let rel = format!("nativelibs/{}/{}", abi, lib);
            match ctx.resources().resource(&rel) {
                Ok(source) => {
                    let target = lib_dir.join(abi).join(lib);
                    if let Some(parent) = target.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::copy(&source, &target)?;
                }
                Err(_) => warn!("no {} build of native library {}", abi, lib),
            }
        }
    }
    Ok(())
}

/// Streams the protobuf temp package apart into the module skeleton:
/// manifest under `manifest/`, `resources.pb` at the module root,
/// `assets/` and `res/` trees verbatim.
fn extract_proto_package(
    package: &Path,
    android: &crate::paths::AndroidPaths,
) -> Result<(), BuildError> {
    let mut archive = ZipArchive::new(File::open(package)?)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let target = if name == "AndroidManifest.xml" {
            android.aab_manifest_dir().join("AndroidManifest.xml")
        } else if name == "resources.pb" {
            android.aab_dir().join("resources.pb")
        } else if let Some(rest) = name.strip_prefix("assets/") {
            android.aab_assets_dir().join(rest)
        } else if let Some(rest) = name.strip_prefix("res/") {
            android.aab_res_dir().join(rest)
        } else {
            continue;
        };
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;
        std::fs::write(&target, content)?;
    }
    Ok(())
}

/// Zips the staged module tree with slash-separated entry names.
fn zip_module(module_dir: &Path, output: &Path) -> Result<(), BuildError> {
    let mut writer = ZipWriter::new(File::create(output)?);
    let options = FileOptions::default();
    for entry in walkdir::WalkDir::new(module_dir) {
        let entry =
            entry.map_err(|e| BuildError::Config(format!("walking {:?}: {}", module_dir, e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(module_dir)
            .map_err(|e| BuildError::Config(format!("zipping {:?}: {}", entry.path(), e)))?;
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        writer.start_file(name, options)?;
        let mut content = Vec::new();
        File::open(entry.path())?.read_to_end(&mut content)?;
        writer.write_all(&content)?;
    }
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::BuildPaths;
    use crate::TargetPlatform;

    fn make_proto_package(path: &Path) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        let options = FileOptions::default();
        for (name, content) in [
            ("AndroidManifest.xml", b"proto-manifest" as &[u8]),
            ("resources.pb", b"proto-resources"),
            ("res/drawable/icon.png", b"png"),
            ("assets/sound.mp3", b"mp3"),
            ("classes.dex", b"ignored"),
        ] {
            writer.start_file(name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn proto_package_lands_in_module_skeleton() {
        let dir = tempfile::tempdir().unwrap();
        let paths = BuildPaths::for_target(dir.path().join("build"), TargetPlatform::Aab);
        paths.mkdirs().unwrap();
        let android = paths.android().unwrap();

        let package = dir.path().join("package.ap_");
        make_proto_package(&package);
        extract_proto_package(&package, android).unwrap();

        assert!(android.aab_manifest_dir().join("AndroidManifest.xml").is_file());
        assert!(android.aab_dir().join("resources.pb").is_file());
        assert!(android.aab_res_dir().join("drawable/icon.png").is_file());
        assert!(android.aab_assets_dir().join("sound.mp3").is_file());
        // DEX lands via relocation, never via extraction
        assert!(!android.aab_dex_dir().join("classes.dex").exists());
    }

    #[test]
    fn module_zip_uses_slash_names() {
        let dir = tempfile::tempdir().unwrap();
        let module = dir.path().join("aab");
        std::fs::create_dir_all(module.join("manifest")).unwrap();
        std::fs::write(module.join("manifest/AndroidManifest.xml"), b"mf").unwrap();
        std::fs::write(module.join("resources.pb"), b"pb").unwrap();

        let zip_path = dir.path().join("base.zip");
        zip_module(&module, &zip_path).unwrap();

        let mut archive = ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["manifest/AndroidManifest.xml", "resources.pb"]);
    }

    #[test]
    fn bundle_config_lists_media_globs() {
        let config = serde_json::json!({
            "compression": {"uncompressedGlob": UNCOMPRESSED_GLOBS}
        });
        let globs = config["compression"]["uncompressedGlob"].as_array().unwrap();
        assert_eq!(globs.len(), UNCOMPRESSED_GLOBS.len());
        assert!(globs.iter().any(|g| g == "**/*.png"));
    }
}
