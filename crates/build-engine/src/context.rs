//! Compiler Context
//!
//! The shared build state threaded through every task: project handle,
//! used component types, per-component block usage, flags, owned paths
//! and resources, and the fields later tasks populate. Constructed once
//! per build via the fluent builder; required fields are validated
//! before any task runs.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use blockforge_components::{ComponentBuildInfo, ComponentInfo};
use blockforge_toolchain::Resources;

use crate::paths::BuildPaths;
use crate::project::Project;
use crate::reporter::BuildReporter;
use crate::{BuildError, TargetPlatform};

/// Default per-child-process RAM ceiling in megabytes.
pub const DEFAULT_CHILD_RAM_MB: u32 = 2048;
/// RAM held back from the signer child process.
pub const SIGNER_RAM_RESERVE_MB: u32 = 200;

/// Shared mutable state for one build invocation.
pub struct CompilerContext {
    // Immutable after build()
    project: Option<Project>,
    comp_types: BTreeSet<String>,
    comp_blocks: HashMap<String, BTreeSet<String>>,
    reporter: Arc<dyn BuildReporter>,
    keystore_path: PathBuf,
    child_ram_mb: u32,
    dex_cache_dir: Option<PathBuf>,
    output_file_name: String,
    for_companion: bool,
    for_emulator: bool,
    include_dangerous_permissions: bool,
    target: TargetPlatform,
    paths: BuildPaths,
    resources: Arc<Resources>,
    component_info: ComponentInfo,

    // Populated by tasks
    build_info: Vec<ComponentBuildInfo>,
    simple_comp_types: BTreeSet<String>,
    ext_comp_types: BTreeSet<String>,
    ext_type_path_cache: HashMap<String, PathBuf>,
    dex_files: Vec<PathBuf>,
}

impl CompilerContext {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn comp_types(&self) -> &BTreeSet<String> {
        &self.comp_types
    }

    pub fn comp_blocks(&self) -> &HashMap<String, BTreeSet<String>> {
        &self.comp_blocks
    }

    pub fn reporter(&self) -> &Arc<dyn BuildReporter> {
        &self.reporter
    }

    pub fn keystore_path(&self) -> &Path {
        &self.keystore_path
    }

    pub fn child_ram_mb(&self) -> u32 {
        self.child_ram_mb
    }

    pub fn dex_cache_dir(&self) -> Option<&Path> {
        self.dex_cache_dir.as_deref()
    }

    pub fn output_file_name(&self) -> &str {
        &self.output_file_name
    }

    /// Final artifact location under the deploy directory.
    pub fn deploy_file(&self) -> PathBuf {
        self.paths.deploy_dir().join(&self.output_file_name)
    }

    pub fn for_companion(&self) -> bool {
        self.for_companion
    }

    pub fn for_emulator(&self) -> bool {
        self.for_emulator
    }

    pub fn include_dangerous_permissions(&self) -> bool {
        self.include_dangerous_permissions
    }

    pub fn target(&self) -> TargetPlatform {
        self.target
    }

    pub fn paths(&self) -> &BuildPaths {
        &self.paths
    }

    pub fn resources(&self) -> &Arc<Resources> {
        &self.resources
    }

    pub fn component_info(&self) -> &ComponentInfo {
        &self.component_info
    }

    /// Combined simple + extension build info, memoized by ReadBuildInfo.
    pub fn build_info(&self) -> &[ComponentBuildInfo] {
        &self.build_info
    }

    pub fn simple_comp_types(&self) -> &BTreeSet<String> {
        &self.simple_comp_types
    }

    pub fn ext_comp_types(&self) -> &BTreeSet<String> {
        &self.ext_comp_types
    }

    pub fn ext_type_path(&self, component_type: &str) -> Option<&Path> {
        self.ext_type_path_cache.get(component_type).map(PathBuf::as_path)
    }

    pub fn dex_files(&self) -> &[PathBuf] {
        &self.dex_files
    }

    pub(crate) fn set_build_info(
        &mut self,
        build_info: Vec<ComponentBuildInfo>,
        simple_types: BTreeSet<String>,
        ext_types: BTreeSet<String>,
        ext_paths: HashMap<String, PathBuf>,
    ) {
        self.build_info = build_info;
        self.simple_comp_types = simple_types;
        self.ext_comp_types = ext_types;
        self.ext_type_path_cache = ext_paths;
    }

    pub(crate) fn set_dex_files(&mut self, dex_files: Vec<PathBuf>) {
        self.dex_files = dex_files;
    }
}

/// Fluent builder with required-field validation.
#[derive(Default)]
pub struct ContextBuilder {
    project: Option<Project>,
    comp_types: Option<BTreeSet<String>>,
    comp_blocks: Option<HashMap<String, BTreeSet<String>>>,
    reporter: Option<Arc<dyn BuildReporter>>,
    keystore_path: Option<PathBuf>,
    child_ram_mb: Option<u32>,
    dex_cache_dir: Option<PathBuf>,
    output_file_name: Option<String>,
    for_companion: bool,
    for_emulator: bool,
    include_dangerous_permissions: bool,
    build_dir: Option<PathBuf>,
    resources: Option<Arc<Resources>>,
}

impl ContextBuilder {
    pub fn with_project(mut self, project: Project) -> Self {
        self.project = Some(project);
        self
    }

    /// Fully-qualified component types the project places.
    pub fn with_types(mut self, comp_types: BTreeSet<String>) -> Self {
        self.comp_types = Some(comp_types);
        self
    }

    /// Unqualified component type -> block names used in the project.
    pub fn with_blocks(mut self, comp_blocks: HashMap<String, BTreeSet<String>>) -> Self {
        self.comp_blocks = Some(comp_blocks);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn BuildReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn with_keystore(mut self, keystore_path: impl Into<PathBuf>) -> Self {
        self.keystore_path = Some(keystore_path.into());
        self
    }

    pub fn with_child_ram_mb(mut self, ram_mb: u32) -> Self {
        self.child_ram_mb = Some(ram_mb);
        self
    }

    pub fn with_dex_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dex_cache_dir = Some(dir.into());
        self
    }

    pub fn with_output_file_name(mut self, name: impl Into<String>) -> Self {
        self.output_file_name = Some(name.into());
        self
    }

    pub fn for_companion(mut self, companion: bool) -> Self {
        self.for_companion = companion;
        self
    }

    pub fn for_emulator(mut self, emulator: bool) -> Self {
        self.for_emulator = emulator;
        self
    }

    pub fn include_dangerous_permissions(mut self, include: bool) -> Self {
        self.include_dangerous_permissions = include;
        self
    }

    pub fn with_build_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.build_dir = Some(dir.into());
        self
    }

    pub fn with_resources(mut self, resources: Arc<Resources>) -> Self {
        self.resources = Some(resources);
        self
    }

    /// Validate required fields, lay out the target's build tree, and
    /// assemble the context. Fails fast before any task runs.
    pub fn build(self, target: TargetPlatform) -> Result<CompilerContext, BuildError> {
        let comp_types = self
            .comp_types
            .ok_or_else(|| BuildError::Config("component types not set".into()))?;
        let comp_blocks = self
            .comp_blocks
            .ok_or_else(|| BuildError::Config("component block usage not set".into()))?;
        let reporter = self
            .reporter
            .ok_or_else(|| BuildError::Config("reporter not set".into()))?;
        let keystore_path = self
            .keystore_path
            .ok_or_else(|| BuildError::Config("keystore path not set".into()))?;
        let resources = self
            .resources
            .ok_or_else(|| BuildError::Config("resources not set".into()))?;

        // A missing project is tolerated for test harness use only.
        if self.project.is_none() {
            warn!("building without a project; only test harnesses should do this");
        }

        let build_dir = match (&self.build_dir, &self.project) {
            (Some(dir), _) => dir.clone(),
            (None, Some(project)) => project.root.join("build"),
            (None, None) => {
                return Err(BuildError::Config(
                    "build directory required when no project is set".into(),
                ))
            }
        };

        let output_file_name = self.output_file_name.unwrap_or_else(|| {
            let stem = self
                .project
                .as_ref()
                .map(|p| p.name.as_str())
                .unwrap_or("app");
            format!("{}.{}", stem, target.extension())
        });

        let paths = BuildPaths::for_target(build_dir, target);
        paths.mkdirs()?;

        Ok(CompilerContext {
            project: self.project,
            comp_types,
            comp_blocks,
            reporter,
            keystore_path,
            child_ram_mb: self.child_ram_mb.unwrap_or(DEFAULT_CHILD_RAM_MB),
            dex_cache_dir: self.dex_cache_dir,
            output_file_name,
            for_companion: self.for_companion,
            for_emulator: self.for_emulator,
            include_dangerous_permissions: self.include_dangerous_permissions,
            target,
            paths,
            resources,
            component_info: ComponentInfo::new(),
            build_info: Vec::new(),
            simple_comp_types: BTreeSet::new(),
            ext_comp_types: BTreeSet::new(),
            ext_type_path_cache: HashMap::new(),
            dex_files: Vec::new(),
        })
    }
}
