//! `plinth plan` - show the ordered step list

use anyhow::Result;
use convergence::plan;

use crate::cli::ParamArgs;
use crate::{catalog, commands, ui};

pub fn run(args: &ParamArgs, json: bool) -> Result<()> {
    let params = commands::load_params(args)?;
    let steps = catalog::build(&params)?;
    let ordered = plan(steps)?;

    if json {
        let entries: Vec<_> = ordered
            .iter()
            .map(|s| {
                serde_json::json!({
                    "name": s.name,
                    "resource": s.resource.to_string(),
                    "requires": s.requires,
                    "action": s.action.describe(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    ui::header(&format!("Provisioning plan for {}", params.domain));
    for (i, step) in ordered.iter().enumerate() {
        ui::step(
            i + 1,
            ordered.len(),
            &format!("{} ({})", step.name, step.resource),
        );
        if !step.requires.is_empty() {
            ui::dim(&format!("  after: {}", step.requires.join(", ")));
        }
    }

    Ok(())
}
