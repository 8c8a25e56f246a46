use clap::{Args, Parser, Subcommand};
use qcurate::core::models::collection::CollectionKind;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The qcurate developers",
    version,
    about = "qcurate - Retrieve, curate and re-label QCArchive optimization and torsion-drive datasets for force-field fitting.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel filtering.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download datasets from a QCArchive server into a local JSON cache.
    Fetch(FetchArgs),
    /// Apply the curation filters to a cached collection.
    Filter(FilterArgs),
    /// Assign force-field parameters to molecules.
    Label(LabelArgs),
}

/// Arguments for the `fetch` subcommand.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Kind of dataset to download (optimization or torsiondrive).
    #[arg(short, long, value_name = "KIND")]
    pub kind: CollectionKind,

    /// Name of a dataset on the server. Can be used multiple times.
    #[arg(short, long = "dataset", value_name = "NAME")]
    pub datasets: Vec<String>,

    /// Path of the JSON cache to write.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Override the server address.
    #[arg(long, value_name = "URL")]
    pub address: Option<String>,

    /// Override the specification whose records are retrieved.
    #[arg(long, value_name = "NAME")]
    pub spec_name: Option<String>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Arguments for the `filter` subcommand.
#[derive(Args, Debug)]
pub struct FilterArgs {
    /// Kind of collection to curate (optimization or torsiondrive).
    #[arg(short, long, value_name = "KIND")]
    pub kind: CollectionKind,

    /// Path of the JSON cache to read.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path of the curated JSON cache to write.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Allow iodine-containing molecules in optimization datasets.
    #[arg(long)]
    pub include_iodine: bool,

    /// Override the maximum number of conformers kept per molecule.
    #[arg(long, value_name = "INT")]
    pub max_conformers: Option<usize>,

    /// Override the bond-guessing tolerance of the connectivity check.
    #[arg(long, value_name = "FLOAT")]
    pub tolerance: Option<f64>,

    /// Override the minimum RMSD (Å) between retained conformers.
    #[arg(long, value_name = "FLOAT")]
    pub rmsd_tolerance: Option<f64>,

    /// Override the charge method used by the torsion-drive charge check.
    #[arg(long, value_name = "METHOD")]
    pub charge_method: Option<String>,

    /// Remove a record id before filtering. Can be used multiple times.
    #[arg(long = "deny", value_name = "ID")]
    pub deny: Vec<u64>,

    /// Additionally drop records with intramolecular hydrogen bonds.
    #[arg(long)]
    pub reject_hydrogen_bonds: bool,

    /// Write the ids of every removed record to a CSV file.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

/// Arguments for the `label` subcommand.
#[derive(Args, Debug)]
pub struct LabelArgs {
    /// Path to the force field in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub forcefield: PathBuf,

    #[command(flatten)]
    pub molecules: MoleculeSource,

    /// Path of the JSON file receiving the parameter assignments.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,
}

/// Where the molecules to label come from.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct MoleculeSource {
    /// A (mapped or unmapped) SMILES string. Can be used multiple times.
    #[arg(long, value_name = "SMILES")]
    pub smiles: Vec<String>,

    /// A cached collection whose record molecules are labeled.
    #[arg(long, value_name = "PATH")]
    pub collection: Option<PathBuf>,
}
