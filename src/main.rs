//! parfs - Parallel Recursive Delete and Tar Extraction
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use parfs::config::{trace_from_env, CliArgs, Command, DeleteConfig, ExtractConfig, RunOptions};
use parfs::delete::DeleteCoordinator;
use parfs::extract::ExtractCoordinator;
use parfs::progress::{print_delete_summary, print_extract_summary, print_header, ProgressReporter};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    let trace = args.verbose || trace_from_env();
    setup_logging(trace);

    match args.command {
        Command::Rm {
            directory,
            thread_count,
        } => {
            let options = RunOptions::new(thread_count, trace).context("Invalid configuration")?;
            let config = DeleteConfig::new(&directory, options).context("Invalid configuration")?;
            run_rm(config, args.quiet)
        }
        Command::Untar {
            archive,
            thread_count,
            directory,
            collision_backoff_ms,
        } => {
            let options = RunOptions::new(thread_count, trace).context("Invalid configuration")?;
            let config = ExtractConfig::new(&archive, &directory, options)
                .context("Invalid configuration")?
                .with_collision_backoff(Duration::from_millis(collision_backoff_ms));
            run_untar(config, args.quiet)
        }
    }
}

fn run_rm(config: DeleteConfig, quiet: bool) -> Result<()> {
    let root = config.root.display().to_string();

    if !quiet {
        print_header("rm", &root, config.options.worker_count, None);
    }
    let progress = (!quiet).then(ProgressReporter::new);
    if let Some(ref p) = progress {
        p.set_status(&format!("Deleting {}", root));
    }

    let result = DeleteCoordinator::new(config).run();

    if let Some(ref p) = progress {
        if result.is_ok() {
            p.finish("Delete completed");
        } else {
            p.finish_and_clear();
        }
    }
    let summary = result.with_context(|| format!("Failed to delete {}", root))?;

    if !quiet {
        print_delete_summary(&summary, &root);
    }
    Ok(())
}

fn run_untar(config: ExtractConfig, quiet: bool) -> Result<()> {
    let archive = config.archive.display().to_string();
    let destination = display_destination(&config.destination);

    if !quiet {
        print_header(
            "untar",
            &archive,
            config.options.worker_count,
            Some(&destination),
        );
    }
    let progress = (!quiet).then(ProgressReporter::new);
    if let Some(ref p) = progress {
        p.set_status(&format!("Extracting {}", archive));
    }

    let result = ExtractCoordinator::new(config).run();

    if let Some(ref p) = progress {
        if result.is_ok() {
            p.finish("Extract completed");
        } else {
            p.finish_and_clear();
        }
    }
    let summary = result.with_context(|| format!("Failed to extract {}", archive))?;

    if !quiet {
        print_extract_summary(&summary, &destination);
    }
    Ok(())
}

fn display_destination(destination: &Path) -> String {
    std::path::absolute(destination)
        .unwrap_or_else(|_| destination.to_path_buf())
        .display()
        .to_string()
}

fn setup_logging(trace: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if trace {
            EnvFilter::new("parfs=debug,warn")
        } else {
            EnvFilter::new("parfs=info,warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(trace)
        .with_file(false)
        .with_line_number(false)
        .init();
}
