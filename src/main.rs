mod actions;
mod catalog;
mod cli;
mod commands;
mod config;
mod exec;
mod probe;
mod render;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::process::ExitCode;

use config::ValidationError;
use convergence::{PlanError, StepError};
use render::RenderError;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let verbose = cli.verbose > 0;

    match dispatch(cli, verbose) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::error(&format!("{err:#}"));
            ExitCode::from(exit_code(&err))
        }
    }
}

fn dispatch(cli: Cli, verbose: bool) -> Result<()> {
    match cli.command {
        Command::Plan { params, json } => commands::plan::run(&params, json),
        Command::Status { params, json } => commands::status::run(&params, json),
        Command::Apply {
            params,
            yes,
            timeout,
            json,
        } => commands::apply::run(&params, yes, timeout, json, verbose),
        Command::Render { params, kind, out } => {
            commands::render::run(&params, kind, out.as_deref())
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "plinth", &mut io::stdout());
            Ok(())
        }
    }
}

/// Distinct exit codes so automated callers can tell configuration
/// mistakes (2) from plan-time errors (3) from step failures (4)
fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if cause.downcast_ref::<ValidationError>().is_some()
            || matches!(
                cause.downcast_ref::<RenderError>(),
                Some(RenderError::MissingParameter { .. })
            )
        {
            return 2;
        }
        if cause.downcast_ref::<PlanError>().is_some() {
            return 3;
        }
        if cause.downcast_ref::<StepError>().is_some() {
            return 4;
        }
    }
    1
}
