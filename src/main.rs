//! Blockforge CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use tracing::error;
use tracing_subscriber::EnvFilter;

use blockforge::commands::{parse_target, BuildCommand};
use blockforge::VERSION;

const USAGE: &str = "\
blockforge build <project-dir> [options]

Options:
  --target <apk|aab|ipa>   output format (default: apk)
  --companion              build the live-test companion variant
  --emulator               restrict native libraries to emulator ABIs
  --dangerous-permissions  keep SMS/contacts/call-log permissions
  --output <name>          deploy artifact file name
  --keystore <path>        signing keystore (default: <project>/android.keystore)
  --bundled <path>         bundled tools/assets root (default: <project>/bundled)";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run(std::env::args().skip(1).collect()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Vec<String>) -> Result<()> {
    let mut args = args.into_iter();
    match args.next().as_deref() {
        Some("build") => {
            let cmd = parse_build(args)?;
            let artifact = cmd.execute().await?;
            println!("{}", artifact.display());
            Ok(())
        }
        Some("--version") => {
            println!("blockforge {}", VERSION);
            Ok(())
        }
        Some(other) => bail!("unknown command {:?}\n\n{}", other, USAGE),
        None => bail!("missing command\n\n{}", USAGE),
    }
}

fn parse_build(mut args: impl Iterator<Item = String>) -> Result<BuildCommand> {
    let mut project_dir: Option<PathBuf> = None;
    let mut cmd = BuildCommand {
        project_dir: PathBuf::new(),
        target: parse_target("apk")?,
        companion: false,
        emulator: false,
        include_dangerous: false,
        output: None,
        keystore: None,
        bundled: None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--target" => {
                let value = expect_value(&mut args, "--target")?;
                cmd.target = parse_target(&value)?;
            }
            "--companion" => cmd.companion = true,
            "--emulator" => cmd.emulator = true,
            "--dangerous-permissions" => cmd.include_dangerous = true,
            "--output" => cmd.output = Some(expect_value(&mut args, "--output")?),
            "--keystore" => {
                cmd.keystore = Some(PathBuf::from(expect_value(&mut args, "--keystore")?))
            }
            "--bundled" => {
                cmd.bundled = Some(PathBuf::from(expect_value(&mut args, "--bundled")?))
            }
            flag if flag.starts_with("--") => bail!("unknown option {:?}\n\n{}", flag, USAGE),
            path if project_dir.is_none() => project_dir = Some(PathBuf::from(path)),
            extra => bail!("unexpected argument {:?}\n\n{}", extra, USAGE),
        }
    }

    match project_dir {
        Some(dir) => {
            cmd.project_dir = dir;
            Ok(cmd)
        }
        None => bail!("missing <project-dir>\n\n{}", USAGE),
    }
}

fn expect_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    match args.next() {
        Some(value) => Ok(value),
        None => bail!("{} requires a value\n\n{}", flag, USAGE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockforge::build_engine::TargetPlatform;

    #[test]
    fn build_args_round_trip() {
        let cmd = parse_build(
            [
                "myapp",
                "--target",
                "aab",
                "--companion",
                "--output",
                "Demo.aab",
            ]
            .iter()
            .map(|s| s.to_string()),
        )
        .unwrap();
        assert_eq!(cmd.project_dir, PathBuf::from("myapp"));
        assert_eq!(cmd.target, TargetPlatform::Aab);
        assert!(cmd.companion);
        assert_eq!(cmd.output.as_deref(), Some("Demo.aab"));
    }

    #[test]
    fn missing_project_dir_rejected() {
        assert!(parse_build(std::iter::empty()).is_err());
        assert!(parse_build(["--target".to_string()].into_iter()).is_err());
    }
}
