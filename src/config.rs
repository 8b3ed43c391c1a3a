//! Operator-supplied provisioning parameters
//!
//! Every generated artifact and every step derives its values from one
//! validated [`ProvisionParams`] instance, so a port or path can never
//! diverge between the proxy config, the service unit, and the
//! application config. Parameters are immutable after validation.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Operator input rejected before any planning or execution
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("'{0}' is not a valid domain name")]
    InvalidDomain(String),

    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),

    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("port {0} is used by more than one endpoint")]
    PortConflict(u16),

    #[error("port must be nonzero")]
    ZeroPort,

    #[error("worker count must be at least 1")]
    ZeroWorkers,
}

/// The shared parameter set all artifacts and steps are derived from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionParams {
    /// Public domain the proxy answers for
    pub domain: String,
    /// Contact for certificate issuance
    pub admin_email: String,
    /// Name used for the service unit, config file, and log directory
    pub service_name: String,
    /// Unprivileged account the application runs as
    pub service_user: String,
    pub install_dir: PathBuf,
    pub source_url: String,
    pub source_branch: String,
    /// Application HTTP port the proxy forwards to
    pub app_port: u16,
    /// Long-poll port; held connections go here
    pub longpoll_port: u16,
    /// Port the proxy listens on publicly
    pub public_port: u16,
    pub enable_tls: bool,
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    /// Empty means peer authentication via the service account
    pub db_password: String,
    /// Worker process count, derived from CPU cores unless overridden
    pub workers: usize,
    /// Proxy request body cap, e.g. "128m"
    pub max_body_size: String,
    /// Proxy read/send/connect timeouts; the application holds
    /// long-poll connections open far past typical web defaults
    pub proxy_timeout_secs: u64,
    pub log_level: String,
    /// Server entry script relative to the source checkout
    pub entrypoint: String,
    /// Representative base packages; operators extend via the file
    pub system_packages: Vec<String>,
}

/// Optional TOML overrides, merged under CLI flags
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParamsFile {
    pub domain: Option<String>,
    pub admin_email: Option<String>,
    pub service_name: Option<String>,
    pub service_user: Option<String>,
    pub install_dir: Option<String>,
    pub source_url: Option<String>,
    pub source_branch: Option<String>,
    pub app_port: Option<u16>,
    pub longpoll_port: Option<u16>,
    pub public_port: Option<u16>,
    pub enable_tls: Option<bool>,
    pub db_host: Option<String>,
    pub db_port: Option<u16>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub workers: Option<usize>,
    pub max_body_size: Option<String>,
    pub proxy_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
    pub entrypoint: Option<String>,
    pub system_packages: Option<Vec<String>>,
}

impl ParamsFile {
    /// Load a TOML parameter file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid TOML in {}", path.display()))
    }

    /// Default parameter file location, if one exists
    pub fn default_path() -> Option<PathBuf> {
        let path = dirs::home_dir()?
            .join(".config")
            .join("plinth")
            .join("provision.toml");
        path.exists().then_some(path)
    }
}

fn default_workers() -> usize {
    // Worker recommendation for this class of app: two per core plus
    // one cron worker.
    let cores = std::thread::available_parallelism()
        .map(std::num::NonZero::get)
        .unwrap_or(1);
    cores * 2 + 1
}

fn default_packages() -> Vec<String> {
    [
        "git",
        "python3-dev",
        "python3-venv",
        "build-essential",
        "libpq-dev",
        "libxml2-dev",
        "libldap2-dev",
        "libsasl2-dev",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

impl ProvisionParams {
    /// Merge CLI-level values over file values over defaults, then
    /// validate. The result is the single source every artifact reads.
    pub fn resolve(
        domain: Option<String>,
        admin_email: Option<String>,
        enable_tls: bool,
        file: &ParamsFile,
    ) -> Result<Self, ValidationError> {
        let service_name = file
            .service_name
            .clone()
            .unwrap_or_else(|| "erp".to_string());
        let service_user = file
            .service_user
            .clone()
            .unwrap_or_else(|| service_name.clone());
        let install_dir = file.install_dir.as_deref().map_or_else(
            || PathBuf::from("/opt").join(&service_name),
            |raw| PathBuf::from(shellexpand::tilde(raw).as_ref()),
        );

        let params = Self {
            domain: domain
                .or_else(|| file.domain.clone())
                .ok_or(ValidationError::MissingParameter("domain"))?,
            admin_email: admin_email
                .or_else(|| file.admin_email.clone())
                .ok_or(ValidationError::MissingParameter("admin_email"))?,
            service_user: service_user.clone(),
            install_dir,
            source_url: file
                .source_url
                .clone()
                .unwrap_or_else(|| "https://github.com/odoo/odoo.git".to_string()),
            source_branch: file.source_branch.clone().unwrap_or_else(|| "17.0".into()),
            app_port: file.app_port.unwrap_or(8069),
            longpoll_port: file.longpoll_port.unwrap_or(8072),
            public_port: file
                .public_port
                .unwrap_or(if file.enable_tls.unwrap_or(enable_tls) { 443 } else { 80 }),
            enable_tls: file.enable_tls.unwrap_or(enable_tls),
            db_host: file.db_host.clone().unwrap_or_else(|| "localhost".into()),
            db_port: file.db_port.unwrap_or(5432),
            db_user: file.db_user.clone().unwrap_or(service_user),
            db_password: file.db_password.clone().unwrap_or_default(),
            workers: file.workers.unwrap_or_else(default_workers),
            max_body_size: file.max_body_size.clone().unwrap_or_else(|| "128m".into()),
            proxy_timeout_secs: file.proxy_timeout_secs.unwrap_or(720),
            log_level: file.log_level.clone().unwrap_or_else(|| "info".into()),
            entrypoint: file.entrypoint.clone().unwrap_or_else(|| "odoo-bin".into()),
            system_packages: file.system_packages.clone().unwrap_or_else(default_packages),
            service_name,
        };

        params.validate()?;
        Ok(params)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let domain_re = Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)+$")
            .expect("static pattern");
        if !domain_re.is_match(&self.domain.to_lowercase()) {
            return Err(ValidationError::InvalidDomain(self.domain.clone()));
        }

        let email_re = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static pattern");
        if !email_re.is_match(&self.admin_email) {
            return Err(ValidationError::InvalidEmail(self.admin_email.clone()));
        }

        let ports = [self.app_port, self.longpoll_port, self.public_port];
        if ports.contains(&0) || self.db_port == 0 {
            return Err(ValidationError::ZeroPort);
        }
        for (i, port) in ports.iter().enumerate() {
            if ports[i + 1..].contains(port) {
                return Err(ValidationError::PortConflict(*port));
            }
        }

        if self.workers == 0 {
            return Err(ValidationError::ZeroWorkers);
        }

        Ok(())
    }

    // Derived paths. Single definitions so steps and artifacts agree.

    pub fn source_dir(&self) -> PathBuf {
        self.install_dir.join("src")
    }

    pub fn venv_dir(&self) -> PathBuf {
        self.install_dir.join("venv")
    }

    pub fn addons_dir(&self) -> PathBuf {
        self.source_dir().join("addons")
    }

    pub fn app_config_path(&self) -> PathBuf {
        PathBuf::from("/etc").join(format!("{}.conf", self.service_name))
    }

    pub fn unit_path(&self) -> PathBuf {
        PathBuf::from("/etc/systemd/system").join(format!("{}.service", self.service_name))
    }

    pub fn proxy_site_path(&self) -> PathBuf {
        PathBuf::from("/etc/nginx/sites-available").join(&self.domain)
    }

    pub fn proxy_link_path(&self) -> PathBuf {
        PathBuf::from("/etc/nginx/sites-enabled").join(&self.domain)
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from("/var/log").join(&self.service_name)
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir().join(format!("{}.log", self.service_name))
    }

    pub fn certificate_path(&self) -> PathBuf {
        PathBuf::from("/etc/letsencrypt/live")
            .join(&self.domain)
            .join("fullchain.pem")
    }

    pub fn certificate_key_path(&self) -> PathBuf {
        PathBuf::from("/etc/letsencrypt/live")
            .join(&self.domain)
            .join("privkey.pem")
    }

    /// Stamp files recording what the last converging run completed
    /// or loaded into running services
    pub fn state_dir(&self) -> PathBuf {
        PathBuf::from("/var/lib/plinth")
    }

    pub fn venv_stamp_path(&self) -> PathBuf {
        self.state_dir().join("venv.ok")
    }

    pub fn proxy_stamp_path(&self) -> PathBuf {
        self.state_dir().join("proxy.ok")
    }

    pub fn service_stamp_path(&self) -> PathBuf {
        self.state_dir().join(format!("{}.ok", self.service_name))
    }
}
