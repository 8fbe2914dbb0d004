//! Generate command - write a CSV, package manifest and CRDs for a version

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bundlegen_catalog::{
    CrdBundleGenerator, CsvGenerator, FileMap, Generator, PackageManifestGenerator, write_files,
};
use bundlegen_core::{APIS_DIR_KEY, Config, DEPLOY_DIR_KEY, DiskSource, Filters, ManifestSource};
use console::style;

use crate::error::{CliError, Result};
use crate::{CsvArgs, LayoutArg};

/// Build the generation config from command line flags
pub fn config_from_args(args: &CsvArgs) -> Result<Config> {
    let operator_name = match &args.operator_name {
        Some(name) => name.clone(),
        None => project_name(&args.project_root)?,
    };

    let mut config = match args.layout {
        LayoutArg::OperatorSdk => Config::new(operator_name),
        LayoutArg::Kubebuilder => Config::kubebuilder(operator_name),
    }
    .with_project_root(&args.project_root);

    if let Some(dir) = &args.deploy_dir {
        config = config.with_input(DEPLOY_DIR_KEY, dir);
    }
    if let Some(dir) = &args.apis_dir {
        config = config.with_input(APIS_DIR_KEY, dir);
    }
    if !args.include.is_empty() {
        config = config.with_filters(Filters::from_paths(&args.include));
    }
    if let Some(dir) = &args.output_dir {
        config = config.with_output_dir(args.project_root.join(dir));
    }

    if let Err(err) = config.validate() {
        let message = err.to_string();
        return Err(CliError::input_with_help(message, "set --operator-name"));
    }
    Ok(config)
}

fn project_name(root: &Path) -> Result<String> {
    let root = std::fs::canonicalize(root)?;
    root.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            CliError::input_with_help(
                format!("cannot derive an operator name from {}", root.display()),
                "set --operator-name",
            )
        })
}

/// Run `generate csv`
pub fn csv(args: &CsvArgs) -> Result<()> {
    let config = config_from_args(args)?;
    let source: Arc<dyn ManifestSource> = Arc::new(DiskSource::new(&args.project_root));

    println!(
        "{} Generating CSV version {} for {}",
        style("→").blue(),
        args.csv_version,
        style(&config.operator_name).cyan()
    );

    let csv_gen = CsvGenerator::new(
        config.clone(),
        &args.csv_version,
        args.from_version.clone(),
        Arc::clone(&source),
    );
    let version = csv_gen.version()?;
    let pkg_gen = PackageManifestGenerator::new(
        config.clone(),
        &args.csv_version,
        &args.csv_channel,
        args.default_channel,
        Arc::clone(&source),
    );

    // Everything is generated before anything is written
    let mut outputs: Vec<(PathBuf, FileMap)> = vec![
        (csv_gen.output_dir(), csv_gen.generate()?),
        (pkg_gen.output_dir(), pkg_gen.generate()?),
    ];
    if args.update_crds {
        let crd_gen = CrdBundleGenerator::new(config.clone(), version, Arc::clone(&source));
        outputs.push((crd_gen.output_dir(), crd_gen.generate()?));
    }

    let mut written = 0;
    for (dir, files) in &outputs {
        for path in write_files(dir, files)? {
            println!("  {} {}", style("✓").green(), path.display());
            written += 1;
        }
    }

    println!(
        "\n{} Wrote {} file(s), channel '{}'{}",
        style("✓").green().bold(),
        written,
        pkg_gen.channel(),
        if args.default_channel { " (default)" } else { "" }
    );
    Ok(())
}
