//! Command implementations for the SFD CLI.
//!
//! Provides subcommands for locating points on the model grid, snapping
//! them onto the stream network and evaluating streamflow depletion
//! between two model runs.

use clap::{Subcommand, ValueEnum};
use sfd_core::point::DEFAULT_ID_COLUMN;
use sfd_core::run::{RunFormat, DEFAULT_OUTPUT_FILE};

pub mod depletion;
pub mod locate;
pub mod snap;

/// Run output format accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Stream listing text written by the solver
    Sfr,
    /// CSV flux table
    Csv,
}

impl From<FormatArg> for RunFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Sfr => RunFormat::SfrListing,
            FormatArg::Csv => RunFormat::Csv,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Intersect planar point coordinates with the model grid
    Locate {
        /// Point table with x and y columns
        #[arg(short = 'p', long)]
        points: String,

        /// Grid definition JSON
        #[arg(short = 'g', long)]
        grid: String,

        /// Output path for the point table with row and col
        #[arg(short = 'o', long)]
        output: String,

        /// Name of the point identity column
        #[arg(long, default_value = DEFAULT_ID_COLUMN)]
        id_column: String,
    },

    /// Snap points onto the stream network
    Snap {
        /// Point table with row and col columns
        #[arg(short = 'p', long)]
        points: String,

        /// Stream network reach table
        #[arg(short = 'n', long)]
        network: String,

        /// Output path for the snapped point table
        #[arg(short = 'o', long)]
        output: String,

        /// Name of the point identity column
        #[arg(long, default_value = DEFAULT_ID_COLUMN)]
        id_column: String,

        /// Cell distances searched along each axis
        #[arg(
            long,
            value_delimiter = ',',
            allow_hyphen_values = true,
            default_values_t = [-1, 0, 1]
        )]
        search_distance: Vec<i64>,

        /// Accept any cell in the window whose row and column occur among the points
        #[arg(long)]
        global_presence: bool,

        /// Let a fallback reach also attach to every other point whose window holds it
        #[arg(long)]
        shared_fallback: bool,
    },

    /// Evaluate streamflow depletion between a historical and a baseline run
    Depletion {
        /// Snapped point table
        #[arg(short = 'p', long)]
        points: String,

        /// Historical run directory
        #[arg(long)]
        historical: String,

        /// Baseline run directory
        #[arg(long)]
        baseline: String,

        /// Output path for the depletion table
        #[arg(short = 'o', long)]
        output: String,

        /// Name of the point identity column
        #[arg(long, default_value = DEFAULT_ID_COLUMN)]
        id_column: String,

        /// Run output format
        #[arg(long, value_enum, default_value_t = FormatArg::Sfr)]
        format: FormatArg,

        /// Output file name inside each run directory
        #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
        output_file: String,

        /// Also write every other flux quantity of both runs
        #[arg(long)]
        wide: bool,
    },
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Locate {
            points,
            grid,
            output,
            id_column,
        } => locate::run_locate(&points, &grid, &output, &id_column),
        Command::Snap {
            points,
            network,
            output,
            id_column,
            search_distance,
            global_presence,
            shared_fallback,
        } => snap::run_snap(
            &points,
            &network,
            &output,
            &id_column,
            &search_distance,
            global_presence,
            shared_fallback,
        ),
        Command::Depletion {
            points,
            historical,
            baseline,
            output,
            id_column,
            format,
            output_file,
            wide,
        } => depletion::run_depletion(
            &points,
            &historical,
            &baseline,
            &output,
            &id_column,
            format.into(),
            &output_file,
            wide,
        ),
    }
}
