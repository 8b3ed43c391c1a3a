use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "plinth")]
#[command(version)]
#[command(about = "Idempotent host provisioning - probe, plan, converge", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Operator parameters shared by every subcommand
#[derive(Parser)]
pub struct ParamArgs {
    /// Public domain name the proxy answers for
    #[arg(short, long, env = "PLINTH_DOMAIN")]
    pub domain: Option<String>,

    /// Administrator email, used for certificate issuance
    #[arg(short, long, env = "PLINTH_EMAIL")]
    pub email: Option<String>,

    /// Obtain a TLS certificate and serve HTTPS
    #[arg(long, env = "PLINTH_TLS")]
    pub tls: bool,

    /// Parameter file (TOML); defaults to ~/.config/plinth/provision.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the ordered provisioning plan without touching the host
    Plan {
        #[command(flatten)]
        params: ParamArgs,

        /// Emit the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Probe every resource and report its current state
    Status {
        #[command(flatten)]
        params: ParamArgs,

        /// Emit resource states as JSON
        #[arg(long)]
        json: bool,
    },

    /// Converge the host to the declared state
    Apply {
        #[command(flatten)]
        params: ParamArgs,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Per-action timeout in seconds (network actions are the
        /// realistic stall points)
        #[arg(long)]
        timeout: Option<u64>,

        /// Emit execution records as JSON when the run ends
        #[arg(long)]
        json: bool,
    },

    /// Render one configuration artifact
    Render {
        #[command(flatten)]
        params: ParamArgs,

        /// Which artifact to render
        #[arg(value_enum)]
        kind: ArtifactArg,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ArtifactArg {
    /// Reverse-proxy site config
    Proxy,
    /// Service-supervisor unit file
    Service,
    /// Application runtime config
    App,
}
