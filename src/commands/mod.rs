//! Subcommand entry points

use anyhow::{Context, Result};

use crate::cli::ParamArgs;
use crate::config::{ParamsFile, ProvisionParams};

pub mod apply;
pub mod plan;
pub mod render;
pub mod status;

/// Resolve operator parameters: CLI flags over file values over
/// defaults. Validation happens here, before any planning.
pub fn load_params(args: &ParamArgs) -> Result<ProvisionParams> {
    let file = match &args.config {
        Some(path) => ParamsFile::load(path)?,
        None => match ParamsFile::default_path() {
            Some(path) => ParamsFile::load(&path)
                .with_context(|| format!("in default parameter file {}", path.display()))?,
            None => ParamsFile::default(),
        },
    };

    let params =
        ProvisionParams::resolve(args.domain.clone(), args.email.clone(), args.tls, &file)?;
    Ok(params)
}
