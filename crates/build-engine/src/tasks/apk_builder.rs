//! RunApkBuilder
//!
//! Seals the APK: the aapt temp package (resources + manifest) is
//! copied entry-for-entry into the deploy artifact, then the primary
//! and secondary DEX files and any required native libraries are added.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::{info, warn};
use zip::{write::FileOptions, ZipArchive, ZipWriter};

use crate::context::CompilerContext;
use crate::BuildError;

/// ABIs packaged for emulator builds.
const EMULATOR_ABIS: [&str; 2] = ["x86", "x86_64"];

pub async fn run_apk_builder(ctx: &mut CompilerContext) -> Result<(), BuildError> {
    let temp_package = ctx.paths().temp_package();
    if !temp_package.is_file() {
        return Err(BuildError::MissingOutput(format!("{:?}", temp_package)));
    }
    if ctx.dex_files().is_empty() {
        return Err(BuildError::MissingOutput("no dex files to package".into()));
    }

    let deploy = ctx.deploy_file();
    let mut writer = ZipWriter::new(File::create(&deploy)?);
    let options = FileOptions::default();

    // Resources and manifest, copied without recompression
    let mut package = ZipArchive::new(File::open(&temp_package)?)?;
    for i in 0..package.len() {
        let entry = package.by_index_raw(i)?;
        writer.raw_copy_file(entry)?;
    }

    // classes.dex, classes2.dex, ...
    for (index, dex) in ctx.dex_files().iter().enumerate() {
        let name = if index == 0 {
            "classes.dex".to_string()
        } else {
            format!("classes{}.dex", index + 1)
        };
        add_file(&mut writer, dex, &name, options)?;
    }

    // Native libraries, resolved from the bundled per-ABI tree
    let native_libs = ctx
        .component_info()
        .all_values(blockforge_components::Category::NativeLibraries);
    if !native_libs.is_empty() {
        let abis: Vec<String> = if ctx.for_emulator() {
            EMULATOR_ABIS.iter().map(|s| s.to_string()).collect()
        } else {
            ctx.project()
                .map(|p| p.abis.clone())
                .unwrap_or_else(|| vec!["armeabi-v7a".to_string(), "arm64-v8a".to_string()])
        };
        for lib in &native_libs {
            for abi in &abis {
                let rel = format!("nativelibs/{}/{}", abi, lib);
                match ctx.resources().resource(&rel) {
                    Ok(source) => {
                        let name = format!("lib/{}/{}", abi, lib);
                        add_file(&mut writer, &source, &name, options)?;
                    }
                    Err(_) => warn!("no {} build of native library {}", abi, lib),
                }
            }
        }
    }

    writer.finish()?;
    info!("sealed {:?}", deploy);
    Ok(())
}

fn add_file(
    writer: &mut ZipWriter<File>,
    source: &Path,
    name: &str,
    options: FileOptions,
) -> Result<(), BuildError> {
    let mut content = Vec::new();
    File::open(source)?.read_to_end(&mut content)?;
    writer.start_file(name, options)?;
    writer.write_all(&content)?;
    Ok(())
}
