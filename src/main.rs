use anyhow::Result;
use clap::Parser;
use lockscope::cli::{Cli, Commands};
use lockscope::commands::{self, AnalyzeConfig};
use lockscope::observability::{init_logging, install_panic_hook};
use std::process::ExitCode;

/// Exit status when `--fail-on-findings` is set and something was found.
const FINDINGS_EXIT_CODE: u8 = 2;

fn main() -> Result<ExitCode> {
    install_panic_hook();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            path,
            language,
            extensions,
            config,
            format,
            output,
            jobs,
            dump_graph,
            dump_on_error,
            fail_on_findings,
            verbose,
        } => {
            init_logging(verbose);
            let found = commands::handle_analyze(AnalyzeConfig {
                path,
                language,
                extensions,
                config,
                format,
                output,
                jobs,
                dump_graph,
                dump_on_error,
            })?;
            if found && fail_on_findings {
                return Ok(ExitCode::from(FINDINGS_EXIT_CODE));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Init { force } => {
            init_logging(0);
            commands::init_config(force)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
