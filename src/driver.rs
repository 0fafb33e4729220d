//! Orchestrates a full build: parse manifest, resolve versions, materialize
//! sources, discover the toolchain, plan build edges, emit `build.ninja`,
//! and hand off to `ninja` (spec 4.G).

use crate::cli::{BuildArgs, Cli, Commands};
use crate::config::Config;
use crate::error::Result;
use crate::manifest::Manifest;
use crate::registry::HttpRegistry;
use crate::resolver::PackageOrigin;
use crate::source_store::SourceStore;
use crate::status::{PipelineStage, StatusReporter};
use crate::toolchain::Toolchain;
use crate::{planner, resolver, runner};
use camino::Utf8PathBuf;
use std::collections::HashMap;

const MANIFEST_FILE_NAME: &str = "poac.toml";
const BUILD_FILE_NAME: &str = "build.ninja";

/// Run the command `cli` selected, returning an [`crate::error::Error`]
/// whose [`crate::error::Error::exit_code`] the caller should return.
///
/// # Errors
///
/// Propagates any failure from manifest parsing, resolution, source
/// materialization, toolchain discovery, planning, or the `ninja`
/// subprocess itself.
pub fn run(cli: &Cli, reporter: &dyn StatusReporter) -> Result<()> {
    let command = cli.command.clone().unwrap_or(Commands::Build(BuildArgs {
        release: false,
        targets: Vec::new(),
    }));

    match command {
        Commands::Build(args) => build(cli, &args, reporter),
        Commands::Manifest { file } => {
            let (config, manifest) = load(cli, false)?;
            let (resolution, source_dirs, toolchain) = prepare(&config, &manifest, reporter)?;
            reporter.report_stage(PipelineStage::BuildPlanning);
            let text = planner::plan(&resolution, &source_dirs, &toolchain, config.profile, &config.out_dir)?;
            std::fs::write(&file, text).map_err(|source| crate::error::Error::Io {
                path: file.clone(),
                source,
            })
        }
        Commands::Clean => clean(cli),
    }
}

fn load(cli: &Cli, release: bool) -> Result<(Config, Manifest)> {
    let config = Config::from_cli(cli, release);
    let manifest = Manifest::load(&config.manifest_path)?;
    Ok((config, manifest))
}

fn prepare(
    config: &Config,
    manifest: &Manifest,
    reporter: &dyn StatusReporter,
) -> Result<(resolver::ResolutionSet, HashMap<String, Utf8PathBuf>, Toolchain)> {
    reporter.report_stage(PipelineStage::VersionResolution);
    let registry = HttpRegistry::new(config.registry_url.clone());
    let resolution = resolver::resolve(
        manifest,
        &config.project_dir,
        MANIFEST_FILE_NAME,
        &registry,
        false,
    )?;

    reporter.report_stage(PipelineStage::SourceMaterialization);
    let store = SourceStore::new(config.store_dir.clone());
    let mut source_dirs = HashMap::new();
    source_dirs.insert(manifest.package.name.clone(), config.project_dir.clone());
    for package in resolution.packages.iter().skip(1) {
        let dir = match &package.origin {
            PackageOrigin::Registry => store.ensure(&package.name, &package.version, &registry)?,
            PackageOrigin::Path(path) => path.clone(),
            PackageOrigin::Git { .. } => continue,
        };
        source_dirs.insert(package.name.clone(), dir);
    }

    reporter.report_stage(PipelineStage::ToolchainDiscovery);
    let toolchain = Toolchain::discover()?;

    Ok((resolution, source_dirs, toolchain))
}

fn build(cli: &Cli, args: &BuildArgs, reporter: &dyn StatusReporter) -> Result<()> {
    reporter.report_stage(PipelineStage::ManifestParsing);
    let (config, manifest) = load(cli, args.release)?;
    let (resolution, source_dirs, toolchain) = prepare(&config, &manifest, reporter)?;

    reporter.report_stage(PipelineStage::BuildPlanning);
    let ninja_text = planner::plan(&resolution, &source_dirs, &toolchain, config.profile, &config.out_dir)?;
    let build_file = config.out_dir.join(BUILD_FILE_NAME);
    std::fs::create_dir_all(&config.out_dir).map_err(|source| crate::error::Error::Io {
        path: config.out_dir.clone().into_std_path_buf(),
        source,
    })?;
    std::fs::write(&build_file, &ninja_text).map_err(|source| crate::error::Error::Io {
        path: build_file.clone().into_std_path_buf(),
        source,
    })?;

    reporter.report_stage(PipelineStage::NinjaSynthesisAndExecution);
    let program = runner::resolve_ninja_program();
    runner::run_ninja(&program, &build_file, None, config.jobs, &args.targets)
}

fn clean(cli: &Cli) -> Result<()> {
    let config = Config::from_cli(cli, false);
    if config.out_dir.is_dir() {
        std::fs::remove_dir_all(&config.out_dir).map_err(|source| crate::error::Error::Io {
            path: config.out_dir.clone().into_std_path_buf(),
            source,
        })?;
    }
    Ok(())
}
