//! CLI entry point and dispatch.
//!
//! `run()` parses arguments, discovers configuration, creates the tokio
//! runtime, dispatches to a command handler and owns all error output.

use clap::Parser;
use std::path::Path;

use super::args::{Cli, Commands};
use super::commands::{self, Locations};
use crate::{CliArgs, Config, ExemplarError, ExitCode};
use exemplar_utils::logging::init_tracing;

/// Main CLI execution function.
///
/// Returns `Err(ExitCode)` after printing the failure to stderr; `main`
/// only maps the code to a process exit.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let (batch_size, max_iterations) = match &cli.command {
        Commands::Extract { batch_size, .. } => (*batch_size, None),
        Commands::All {
            batch_size,
            max_iterations,
            ..
        } => (*batch_size, *max_iterations),
        _ => (None, None),
    };
    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        model: cli.model.clone(),
        provider: cli.provider.clone(),
        verbose: cli.verbose.then_some(true),
        batch_size,
        max_iterations,
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            let err = ExemplarError::from(err);
            eprintln!("✗ Configuration failed: {err}");
            eprintln!("{}", err.display_for_user());
            return Err(ExitCode::FAILURE);
        }
    };
    let verbose = config.defaults.verbose.unwrap_or(false);

    if let Err(e) = init_tracing(verbose) {
        eprintln!("Warning: failed to initialise logging: {e}");
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::FAILURE);
        }
    };

    let operation = cli.command.name();
    let needs_llm = cli.command.needs_llm();

    let result = rt.block_on(async {
        let capabilities = if needs_llm {
            Some(commands::llm_capabilities(&config)?)
        } else {
            None
        };

        match cli.command {
            Commands::Discover { repo, docs, limit } => {
                let pipeline = Locations::resolve(&repo.repo, &docs, None)?.pipeline(&config, capabilities);
                commands::execute_discover_command(&pipeline, limit).await
            }
            Commands::Extract { repo, docs, .. } => {
                let pipeline = Locations::resolve(&repo.repo, &docs, None)?.pipeline(&config, capabilities);
                commands::execute_extract_command(&pipeline).await
            }
            Commands::Distill { docs } => {
                let pipeline = Locations::resolve(Path::new("."), &docs, None)?.pipeline(&config, capabilities);
                commands::execute_distill_command(&pipeline).await
            }
            Commands::Generate {
                repo,
                docs,
                examples,
            } => {
                let pipeline =
                    Locations::resolve(&repo.repo, &docs, Some(&examples))?.pipeline(&config, capabilities);
                commands::execute_generate_command(&pipeline).await
            }
            Commands::Quality {
                repo,
                docs,
                examples,
                iteration,
            } => {
                let pipeline =
                    Locations::resolve(&repo.repo, &docs, Some(&examples))?.pipeline(&config, capabilities);
                commands::execute_quality_command(&pipeline, iteration).await
            }
            Commands::Refine {
                docs,
                examples,
                iteration,
            } => {
                let pipeline =
                    Locations::resolve(Path::new("."), &docs, Some(&examples))?.pipeline(&config, capabilities);
                commands::execute_refine_command(&pipeline, iteration).await
            }
            Commands::All {
                repo,
                docs,
                examples,
                limit,
                ..
            } => {
                let pipeline =
                    Locations::resolve(&repo.repo, &docs, Some(&examples))?.pipeline(&config, capabilities);
                commands::execute_all_command(&pipeline, limit).await
            }
        }
    });

    match result {
        Ok(()) => Ok(()),
        Err(err) => {
            report_failure(operation, &err, verbose);
            Err(ExitCode::FAILURE)
        }
    }
}

/// Print the failure banner, suggestions and, when verbose, the cause chain.
fn report_failure(operation: &str, err: &anyhow::Error, verbose: bool) {
    let exemplar_error = err.chain().find_map(|e| e.downcast_ref::<ExemplarError>());
    let phase = exemplar_error
        .and_then(ExemplarError::phase)
        .map_or(operation, |p| p.as_str());

    eprintln!("✗ {phase} phase failed: {err}");
    if let Some(e) = exemplar_error {
        eprintln!("{}", e.display_for_user());
    }
    if verbose {
        eprintln!("{err:?}");
    }
}
