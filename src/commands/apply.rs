//! `plinth apply` - converge the host

use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use convergence::{
    ExecutionRecord, RunObserver, RunOptions, Runner, Step, StepStatus, plan,
};
use dialoguer::Confirm;

use crate::cli::ParamArgs;
use crate::probe::HostProbe;
use crate::{catalog, commands, ui};

/// Per-step terminal reporting, plugged into the engine's observer seam
struct ConsoleObserver;

impl RunObserver for ConsoleObserver {
    fn on_step_start(&self, index: usize, total: usize, step: &Step) {
        ui::step(
            index + 1,
            total,
            &format!("{} ({})", step.name, step.resource),
        );
    }

    fn on_record(&self, record: &ExecutionRecord) {
        match record.status {
            StepStatus::Skipped => println!("    {} already satisfied", "○".dimmed()),
            StepStatus::Succeeded => println!("    {} converged", "✓".green()),
            StepStatus::Failed => {
                if let Some(error) = &record.error {
                    println!("    {} {error}", "✗".red());
                }
            }
        }
    }
}

pub fn run(
    args: &ParamArgs,
    yes: bool,
    timeout: Option<u64>,
    json: bool,
    verbose: bool,
) -> Result<()> {
    let params = commands::load_params(args)?;
    let ordered = plan(catalog::build(&params)?)?;

    ui::header(&format!("Provisioning {}", params.domain));
    ui::kv("steps", &ordered.len().to_string());
    ui::kv("service", &params.service_name);
    ui::kv(
        "tls",
        if params.enable_tls { "enabled" } else { "disabled" },
    );
    println!();

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt("Continue?")
            .default(true)
            .interact()?;
        if !confirmed {
            ui::warn("Aborted");
            return Ok(());
        }
    }

    let options = RunOptions {
        timeout: timeout.map(Duration::from_secs),
        verbose,
    };
    let probe = HostProbe;
    let observer = ConsoleObserver;
    let result = Runner::new(&probe, options)
        .with_observer(&observer)
        .run(&ordered);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    println!();
    if let Some(failure) = &result.failure {
        ui::error(&format!(
            "Step '{}' failed on {}: {}",
            failure.step, failure.resource, failure.message
        ));
        let completed = result
            .records
            .iter()
            .filter(|r| r.status != StepStatus::Failed)
            .map(|r| r.step.as_str())
            .collect::<Vec<_>>();
        if !completed.is_empty() {
            ui::dim(&format!("completed before failure: {}", completed.join(", ")));
        }
        ui::dim("fix the underlying issue and re-run; completed steps will be skipped");

        return Err(match failure.error.clone() {
            Some(step_error) => anyhow::Error::new(step_error),
            None => anyhow::anyhow!(failure.message.clone()),
        });
    }

    let skipped = result.count(StepStatus::Skipped);
    let converged = result.count(StepStatus::Succeeded);
    if converged == 0 {
        ui::success(&format!("Host already converged ({skipped} steps skipped)"));
    } else {
        ui::success(&format!(
            "Provisioning complete: {converged} steps converged, {skipped} already satisfied"
        ));
    }

    Ok(())
}
