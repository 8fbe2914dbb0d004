//! bundlegen CLI - OLM bundle metadata for Kubernetes operators

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;
mod error;
mod exit_codes;

#[derive(Parser)]
#[command(name = "bundlegen")]
#[command(version)]
#[command(about = "Generate OLM catalog metadata for Kubernetes operators", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate catalog files
    Generate {
        #[command(subcommand)]
        target: GenerateTarget,
    },
}

#[derive(Subcommand)]
enum GenerateTarget {
    /// Generate a ClusterServiceVersion and update the package manifest
    Csv(CsvArgs),
}

/// Project layout conventions
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum LayoutArg {
    /// deploy/ and pkg/apis/
    #[default]
    OperatorSdk,
    /// config/ and api/
    Kubebuilder,
}

#[derive(clap::Args, Debug)]
pub struct CsvArgs {
    /// Semantic version of the CSV to generate
    #[arg(long)]
    pub csv_version: String,

    /// Version of an existing CSV to use as base
    #[arg(long)]
    pub from_version: Option<String>,

    /// Operator name (defaults to the project directory name)
    #[arg(long)]
    pub operator_name: Option<String>,

    /// Channel the CSV is published to
    #[arg(long, default_value = "")]
    pub csv_channel: String,

    /// Make the channel the package's default
    #[arg(long)]
    pub default_channel: bool,

    /// Only use these files or directories as inputs
    #[arg(long, value_delimiter = ',')]
    pub include: Vec<PathBuf>,

    /// Write the catalog below this directory instead of the deploy directory,
    /// relative to the project root like the input directories
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Directory holding deployment manifests
    #[arg(long)]
    pub deploy_dir: Option<PathBuf>,

    /// Directory holding API types
    #[arg(long)]
    pub apis_dir: Option<PathBuf>,

    /// Project layout
    #[arg(long, value_enum, default_value_t = LayoutArg::OperatorSdk)]
    pub layout: LayoutArg,

    /// Copy CRD manifests into the version bundle
    #[arg(long)]
    pub update_crds: bool,

    /// Project root directory
    #[arg(long, default_value = ".", env = "BUNDLEGEN_PROJECT_ROOT")]
    pub project_root: PathBuf,
}

fn init_tracing(verbose: bool, debug: bool) {
    let default = if debug {
        "trace"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_target(debug)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.debug);

    let result = match cli.command {
        Commands::Generate {
            target: GenerateTarget::Csv(args),
        } => commands::generate::csv(&args),
    };

    let code = match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}
