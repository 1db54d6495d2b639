//! Build Progress Reporting
//!
//! Every build carries a reporter; the pipeline driver announces each
//! stage through it and surfaces the failing stage on error.

use std::path::Path;

use tracing::{error, info, warn};

/// Receives user-visible build progress.
pub trait BuildReporter: Send + Sync {
    fn stage(&self, name: &str);
    fn warn(&self, message: &str);
    fn error(&self, stage: &str, message: &str);
    fn done(&self, artifact: &Path);
}

/// Reporter backed by structured logging.
#[derive(Debug, Default)]
pub struct LogReporter;

impl BuildReporter for LogReporter {
    fn stage(&self, name: &str) {
        info!("build stage: {}", name);
    }

    fn warn(&self, message: &str) {
        warn!("{}", message);
    }

    fn error(&self, stage: &str, message: &str) {
        error!("stage {} failed: {}", stage, message);
    }

    fn done(&self, artifact: &Path) {
        info!("build complete: {:?}", artifact);
    }
}
