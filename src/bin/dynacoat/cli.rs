use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Paint program speed tools
#[derive(Parser)]
#[clap(version)]
pub struct Cli {
    /// Settings file, defaults to `<config dir>/dynacoat/config.json`
    #[clap(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Adjust program speeds from measured paint thickness
    Adjust(AdjustArgs),

    /// Print line and point differences between two programs
    Diff { first: PathBuf, second: PathBuf },

    /// Print a program summary
    Info { program: PathBuf },

    /// Renumber points in travel order
    Renumber {
        program: PathBuf,

        /// Output file, the input is overwritten when omitted
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct AdjustArgs {
    pub program: PathBuf,

    /// Measurement history json
    #[clap(long)]
    pub history: PathBuf,

    /// Per point speed limits json
    #[clap(long)]
    pub limits: PathBuf,

    /// Output file, the input is overwritten when omitted
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// Coats to apply with the new program
    #[clap(long)]
    pub coats: Option<u32>,

    /// Target thickness, mm
    #[clap(long)]
    pub target: Option<f32>,

    #[clap(long)]
    pub min_rate: Option<f32>,

    #[clap(long)]
    pub max_rate: Option<f32>,

    /// Speed change fraction that raises a warning
    #[clap(long)]
    pub warn_percent: Option<f32>,

    /// Write the change log as CSV
    #[clap(long)]
    pub change_log: Option<PathBuf>,

    /// Save without the paint process header
    #[clap(long)]
    pub non_paint: bool,
}
