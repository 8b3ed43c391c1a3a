//! Planner - total ordering of steps by prerequisite
//!
//! Validate-before-run: duplicate names, unknown prerequisites, and
//! cycles are all rejected here, before any step executes. Tie-break
//! between simultaneously-ready steps is declaration order, so the
//! plan is stable across runs and logs stay diffable.

use std::collections::HashSet;

use crate::error::PlanError;
use crate::step::Step;

/// Order `steps` so every step appears after all of its prerequisites.
///
/// Consumes the catalog and returns it reordered, or the first
/// validation error found.
pub fn plan(steps: Vec<Step>) -> Result<Vec<Step>, PlanError> {
    validate_names(&steps)?;

    let total = steps.len();
    let mut remaining: Vec<Option<Step>> = steps.into_iter().map(Some).collect();
    let mut placed_names: HashSet<String> = HashSet::with_capacity(total);
    let mut ordered: Vec<Step> = Vec::with_capacity(total);

    while ordered.len() < total {
        // First declared step whose prerequisites are all placed.
        let ready = remaining.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|s| s.requires.iter().all(|r| placed_names.contains(r)))
        });

        match ready {
            Some(idx) => {
                let step = remaining[idx].take().expect("slot checked above");
                placed_names.insert(step.name.clone());
                ordered.push(step);
            }
            None => {
                // Nothing ready but steps remain: the leftover subgraph
                // is cyclic. Name the first stuck step.
                let stuck = remaining
                    .iter()
                    .flatten()
                    .next()
                    .map(|s| s.name.clone())
                    .unwrap_or_default();
                return Err(PlanError::Cycle(stuck));
            }
        }
    }

    Ok(ordered)
}

fn validate_names(steps: &[Step]) -> Result<(), PlanError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(steps.len());
    for step in steps {
        if !seen.insert(&step.name) {
            return Err(PlanError::DuplicateName(step.name.clone()));
        }
    }

    for step in steps {
        for dep in &step.requires {
            if !seen.contains(dep.as_str()) {
                return Err(PlanError::UnknownDependency {
                    step: step.name.clone(),
                    requires: dep.clone(),
                });
            }
        }
    }

    Ok(())
}
