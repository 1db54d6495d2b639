//! CreatePayload
//!
//! Assembles the iOS `Payload/<App>.app` skeleton from the project
//! assets and staged frameworks, then zips it into the deploy `.ipa`.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::info;
use zip::{write::FileOptions, ZipWriter};

use crate::context::CompilerContext;
use crate::tasks::copy_tree;
use crate::BuildError;

pub async fn create_payload(ctx: &mut CompilerContext) -> Result<(), BuildError> {
    let ios = ctx
        .paths()
        .ios()
        .ok_or_else(|| BuildError::Config("payload assembly requires the iOS target".into()))?;

    let app_name = ctx
        .project()
        .map(|p| p.label().to_string())
        .unwrap_or_else(|| "app".to_string());
    let app_dir = ios.payload_dir().join(format!("{}.app", app_name));
    std::fs::create_dir_all(&app_dir)?;

    if let Some(project) = ctx.project() {
        let assets = project.assets_dir();
        if assets.is_dir() {
            copy_tree(&assets, &app_dir.join("assets"))?;
        }
    }
    if ios.framework_dir().is_dir() {
        copy_tree(ios.framework_dir(), &app_dir.join("Frameworks"))?;
    }

    let deploy = ctx.deploy_file();
    zip_payload(ios.payload_dir(), &deploy)?;
    if !deploy.is_file() {
        return Err(BuildError::MissingOutput(format!("{:?}", deploy)));
    }
    info!("assembled payload {:?}", deploy);
    Ok(())
}

/// Zips the payload so every entry sits under a top-level `Payload/`
/// directory, which is what installers expect of an ipa.
fn zip_payload(payload_dir: &Path, output: &Path) -> Result<(), BuildError> {
    let mut writer = ZipWriter::new(File::create(output)?);
    let options = FileOptions::default();
    for entry in walkdir::WalkDir::new(payload_dir) {
        let entry =
            entry.map_err(|e| BuildError::Config(format!("walking {:?}: {}", payload_dir, e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(payload_dir)
            .map_err(|e| BuildError::Config(format!("zipping {:?}: {}", entry.path(), e)))?;
        let name = std::iter::once("Payload".to_string())
            .chain(rel.components().map(|c| c.as_os_str().to_string_lossy().into_owned()))
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
    use zip::ZipArchive;

    #[test]
    fn payload_zip_prefixes_entries() {
        let dir = tempfile::tempdir().unwrap();
        let payload = dir.path().join("Payload");
        let app = payload.join("Demo.app");
        std::fs::create_dir_all(app.join("assets")).unwrap();
        std::fs::write(app.join("assets/logo.png"), b"png").unwrap();
        std::fs::write(app.join("binary"), b"bin").unwrap();

        let ipa = dir.path().join("demo.ipa");
        zip_payload(&payload, &ipa).unwrap();

        let mut archive = ZipArchive::new(File::open(&ipa).unwrap()).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec!["Payload/Demo.app/assets/logo.png", "Payload/Demo.app/binary"]
        );
    }
}
