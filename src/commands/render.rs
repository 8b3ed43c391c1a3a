//! `plinth render` - emit a configuration artifact

use std::fs;

use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::{ArtifactArg, ParamArgs};
use crate::render::{TemplateKind, render};
use crate::{commands, ui};

pub fn run(args: &ParamArgs, kind: ArtifactArg, out: Option<&Path>) -> Result<()> {
    let params = commands::load_params(args)?;

    let kind = match kind {
        ArtifactArg::Proxy => TemplateKind::ReverseProxy,
        ArtifactArg::Service => TemplateKind::ServiceUnit,
        ArtifactArg::App => TemplateKind::AppConfig,
    };

    let artifact = render(kind, &params)?;

    match out {
        Some(path) => {
            fs::write(path, &artifact)
                .with_context(|| format!("Could not write {}", path.display()))?;
            ui::success(&format!("Wrote {} artifact to {}", kind.tag(), path.display()));
        }
        None => print!("{artifact}"),
    }

    Ok(())
}
