use crate::report::OutputFormat;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lockscope")]
#[command(about = "Whole-program lock-order deadlock analyzer for Java and C#", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a source tree for lock-order cycles
    Analyze {
        /// Source folder (overrides `src_folder` in the config file)
        path: Option<PathBuf>,

        /// Target language: java or c#
        #[arg(short, long, env = "LOCKSCOPE_LANGUAGE")]
        language: Option<String>,

        /// Comma-separated file extensions to analyze
        #[arg(long)]
        extensions: Option<String>,

        /// Configuration file (defaults to the nearest .lockscope.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: OutputFormat,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Worker threads (0 = all cores)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Print every call graph node before the report
        #[arg(long)]
        dump_graph: bool,

        /// Print the type registry and class tables when the model is inconsistent
        #[arg(long)]
        dump_on_error: bool,

        /// Exit with status 2 when deadlocks or reentrant acquisitions are found
        #[arg(long)]
        fail_on_findings: bool,

        /// Increase log verbosity (-v info, -vv debug, -vvv trace)
        #[arg(short, long, action = ArgAction::Count)]
        verbose: u8,
    },

    /// Write a default .lockscope.toml in the current directory
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}
