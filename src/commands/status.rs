//! `plinth status` - probe every resource, mutate nothing

use anyhow::Result;
use colored::Colorize;
use convergence::{Probe, ProbeState, StepError, plan};

use crate::cli::ParamArgs;
use crate::probe::HostProbe;
use crate::{catalog, commands, ui};

struct StatusEntry {
    step: String,
    resource: String,
    state: Result<ProbeState, StepError>,
    satisfied: bool,
}

impl StatusEntry {
    fn label(&self) -> String {
        match &self.state {
            Ok(state) => state.to_string(),
            Err(e) => format!("error: {e}"),
        }
    }
}

pub fn run(args: &ParamArgs, json: bool) -> Result<()> {
    let params = commands::load_params(args)?;
    let ordered = plan(catalog::build(&params)?)?;

    let probe = HostProbe;
    let mut entries = Vec::new();
    let mut unsatisfied = 0usize;

    for step in &ordered {
        let state = probe.check(&step.resource);
        let satisfied = matches!(&state, Ok(s) if step.resource.satisfied_by(*s));
        if !satisfied {
            unsatisfied += 1;
        }
        entries.push(StatusEntry {
            step: step.name.clone(),
            resource: step.resource.to_string(),
            state,
            satisfied,
        });
    }

    if json {
        let report: Vec<_> = entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "step": e.step,
                    "resource": e.resource,
                    "state": e.label(),
                    "satisfied": e.satisfied,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    ui::header(&format!("Host status for {}", params.domain));
    for entry in &entries {
        let glyph = if entry.satisfied {
            "✓".green()
        } else if entry.state.is_ok() {
            "○".yellow()
        } else {
            "✗".red()
        };
        println!(
            "  {glyph} {} {} {}",
            entry.step,
            entry.resource.dimmed(),
            entry.label()
        );
    }

    println!();
    if unsatisfied == 0 {
        ui::success("Host is fully converged");
    } else {
        ui::info(&format!(
            "{unsatisfied} of {} steps would act on apply",
            entries.len()
        ));
    }

    Ok(())
}
