//! RunMultidex
//!
//! Decides which classes must live in the main DEX file and runs the
//! external dexer over the full classpath. The main-dex set is built
//! from a fixed ordered list of critical inputs: the project's compiled
//! screen classes, the Android runtime jar, the Kawa runtime, a small
//! set of critical support jars, and (for companion builds) the crash
//! reporter. Everything else joins the input list unrecorded and may
//! land in any secondary DEX file.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::context::CompilerContext;
use crate::tasks::{java_jar_cmd, run_tool};
use crate::BuildError;

/// Support jars whose classes must be reachable from the main DEX.
const CRITICAL_JARS: [&str; 4] = [
    "appcompat.jar",
    "common.jar",
    "lifecycle-common.jar",
    "support-compat.jar",
];

pub async fn run_multidex(ctx: &mut CompilerContext) -> Result<(), BuildError> {
    let resources = ctx.resources().clone();
    let (main_dex_classes, inputs) = collect_dex_inputs(ctx)?;
    info!(
        "dexing {} inputs, {} main-dex classes",
        inputs.len(),
        main_dex_classes.len()
    );

    let main_dex_file = ctx.paths().tmp_dir().join("main-dex-classes.txt");
    write_main_dex_list(&main_dex_file, &main_dex_classes)?;

    let dex_out = ctx.paths().tmp_dir().join("dex");
    std::fs::create_dir_all(&dex_out)?;

    let dx = resources.dx()?;
    let mut cmd = java_jar_cmd(&dx, ctx.child_ram_mb());
    cmd.arg("--dex")
        .arg("--multi-dex")
        .arg(format!("--main-dex-list={}", main_dex_file.display()))
        .arg(format!("--output={}", dex_out.display()));
    match ctx.dex_cache_dir() {
        Some(cache) => {
            cmd.arg("--incremental")
                .arg(format!("--dex-cache={}", cache.display()));
        }
        None => {
            cmd.arg("--no-incremental");
        }
    }
    for input in &inputs {
        cmd.arg(input);
    }

    {
        // The dexer is memory-hungry; one at a time per Resources
        let _guard = resources.dexer_guard().await;
        run_tool("dx", &mut cmd).await?;
    }

    // Filesystem listing order, deliberately unsorted
    let mut dex_files = Vec::new();
    for entry in std::fs::read_dir(&dex_out)? {
        let path = entry?.path();
        if path.extension().map(|e| e == "dex").unwrap_or(false) {
            dex_files.push(path);
        }
    }
    if dex_files.is_empty() {
        return Err(BuildError::MissingOutput(format!(
            "no .dex files produced in {:?}",
            dex_out
        )));
    }

    ctx.set_dex_files(dex_files);
    Ok(())
}

/// The main-dex class set plus the full deduplicated dex input list:
/// critical inputs recorded, everything else unrecorded.
fn collect_dex_inputs(
    ctx: &CompilerContext,
) -> Result<(BTreeSet<String>, Vec<PathBuf>), BuildError> {
    let resources = ctx.resources();
    let mut main_dex_classes = BTreeSet::new();
    let mut inputs: Vec<PathBuf> = Vec::new();

    // Critical inputs, recorded into the main-dex set
    let classes_dir = ctx
        .project()
        .map(|p| p.classes_dir())
        .unwrap_or_else(|| ctx.paths().classes_dir().to_path_buf());
    if classes_dir.is_dir() {
        record_directory_classes(&classes_dir, &mut main_dex_classes)?;
        inputs.push(classes_dir);
    } else {
        warn!("no compiled classes at {:?}", classes_dir);
    }

    for jar in [resources.android_runtime_jar()?, resources.kawa_runtime_jar()?] {
        record_jar_classes(&jar, &mut main_dex_classes)?;
        inputs.push(jar);
    }

    for jar in resources.support_jars()? {
        let critical = jar
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| CRITICAL_JARS.contains(&n))
            .unwrap_or(false);
        if critical {
            record_jar_classes(&jar, &mut main_dex_classes)?;
        }
        inputs.push(jar);
    }

    if ctx.for_companion() {
        let acra = resources.acra_jar()?;
        record_jar_classes(&acra, &mut main_dex_classes)?;
        inputs.push(acra);
    }

    // Library jars declared by used components, resolved from the
    // bundled tree; they ride along unrecorded like the extension jars
    for lib in ctx.component_info().unique_libs_needed() {
        inputs.push(resources.library_jar(&lib)?);
    }

    // Extension runtime jars ride along unrecorded
    for ext_type in ctx.ext_comp_types().clone() {
        match ctx.ext_type_path(&ext_type) {
            Some(dir) => {
                let jar = dir.join("classes.jar");
                if jar.is_file() {
                    inputs.push(jar);
                } else {
                    warn!("extension {} has no classes.jar", ext_type);
                }
            }
            None => warn!("no cached path for extension {}", ext_type),
        }
    }

    dedup_inputs(&mut inputs);
    Ok((main_dex_classes, inputs))
}

/// Record every `.class` under a directory, slash-qualified relative to it.
fn record_directory_classes(dir: &Path, classes: &mut BTreeSet<String>) -> Result<(), BuildError> {
    for entry in walkdir::WalkDir::new(dir) {
        let entry = entry.map_err(|e| BuildError::Config(format!("walking {:?}: {}", dir, e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().map(|e| e == "class").unwrap_or(false) {
            let rel = path
                .strip_prefix(dir)
                .map_err(|e| BuildError::Config(format!("recording {:?}: {}", path, e)))?;
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            classes.insert(name);
        }
    }
    Ok(())
}

/// Record every `.class` entry in a jar via its central directory.
fn record_jar_classes(jar: &Path, classes: &mut BTreeSet<String>) -> Result<(), BuildError> {
    let mut archive = ZipArchive::new(File::open(jar)?)?;
    for i in 0..archive.len() {
        let name = archive.by_index_raw(i)?.name().to_string();
        if name.ends_with(".class") {
            classes.insert(name);
        }
    }
    debug!("scanned {:?}", jar);
    Ok(())
}

/// One slash-qualified `.class` path per line.
fn write_main_dex_list(path: &Path, classes: &BTreeSet<String>) -> Result<(), BuildError> {
    let mut file = File::create(path)?;
    for class in classes {
        writeln!(file, "{}", class)?;
    }
    Ok(())
}

fn dedup_inputs(inputs: &mut Vec<PathBuf>) {
    let mut seen = BTreeSet::new();
    inputs.retain(|p| seen.insert(p.clone()));
}
