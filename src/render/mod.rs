//! ConfigRenderer - pure, deterministic artifact generation
//!
//! The three artifacts (reverse-proxy site, service unit, application
//! config) are rendered from the same [`ProvisionParams`] instance, so
//! any value that appears in more than one artifact is interpolated
//! from a single definition. Every field a template requires is
//! checked before interpolation: a missing or empty value is a
//! [`RenderError::MissingParameter`], never a half-rendered file.

use serde_json::{Map, Value};
use tera::Tera;
use thiserror::Error;

use crate::config::ProvisionParams;

const PROXY_TEMPLATE: &str = include_str!("templates/proxy.conf.tera");
const UNIT_TEMPLATE: &str = include_str!("templates/service.unit.tera");
const APP_TEMPLATE: &str = include_str!("templates/app.conf.tera");

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("artifact '{kind}' requires parameter '{field}' which is missing or empty")]
    MissingParameter {
        kind: &'static str,
        field: &'static str,
    },

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("parameters could not be serialized: {0}")]
    Params(#[from] serde_json::Error),
}

/// The artifact kinds the renderer knows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Reverse-proxy site config
    ReverseProxy,
    /// Service-supervisor unit file
    ServiceUnit,
    /// Application runtime config
    AppConfig,
}

impl TemplateKind {
    pub fn tag(self) -> &'static str {
        match self {
            Self::ReverseProxy => "reverse-proxy",
            Self::ServiceUnit => "service-unit",
            Self::AppConfig => "app-config",
        }
    }

    fn template(self) -> &'static str {
        match self {
            Self::ReverseProxy => PROXY_TEMPLATE,
            Self::ServiceUnit => UNIT_TEMPLATE,
            Self::AppConfig => APP_TEMPLATE,
        }
    }

    /// Fields that must be present and non-empty before interpolation
    fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::ReverseProxy => &[
                "service_name",
                "domain",
                "public_port",
                "app_port",
                "longpoll_port",
                "max_body_size",
                "proxy_timeout_secs",
            ],
            Self::ServiceUnit => &[
                "service_name",
                "service_user",
                "venv_dir",
                "source_dir",
                "entrypoint",
                "app_config_path",
            ],
            Self::AppConfig => &[
                "db_host",
                "db_port",
                "db_user",
                "addons_dir",
                "log_file",
                "log_level",
                "app_port",
                "longpoll_port",
                "workers",
            ],
        }
    }
}

/// Render one artifact from the shared parameter set.
///
/// Pure: identical `params` always yields byte-identical text.
pub fn render(kind: TemplateKind, params: &ProvisionParams) -> Result<String, RenderError> {
    let map = context_map(params)?;

    for field in kind.required_fields() {
        if !field_is_usable(map.get(*field)) {
            return Err(RenderError::MissingParameter {
                kind: kind.tag(),
                field,
            });
        }
    }

    let mut tera = Tera::default();
    tera.add_raw_template(kind.tag(), kind.template())?;
    let ctx = tera::Context::from_value(Value::Object(map))?;
    Ok(tera.render(kind.tag(), &ctx)?)
}

/// Flatten params plus derived paths into one template context
fn context_map(params: &ProvisionParams) -> Result<Map<String, Value>, serde_json::Error> {
    let mut map = match serde_json::to_value(params)? {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("params".to_string(), other);
            map
        }
    };

    let derived = [
        ("source_dir", params.source_dir()),
        ("venv_dir", params.venv_dir()),
        ("addons_dir", params.addons_dir()),
        ("app_config_path", params.app_config_path()),
        ("log_file", params.log_file()),
        ("certificate_path", params.certificate_path()),
        ("certificate_key_path", params.certificate_key_path()),
    ];
    for (key, path) in derived {
        map.insert(key.to_string(), Value::String(path.display().to_string()));
    }

    Ok(map)
}

fn field_is_usable(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_params;

    #[test]
    fn render_is_deterministic() {
        let params = test_params();
        let a = render(TemplateKind::ReverseProxy, &params).unwrap();
        let b = render(TemplateKind::ReverseProxy, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn proxy_and_unit_share_the_same_params() {
        let params = test_params();
        assert_eq!(params.app_port, 8069);

        let proxy = render(TemplateKind::ReverseProxy, &params).unwrap();
        let app = render(TemplateKind::AppConfig, &params).unwrap();

        assert!(proxy.contains("127.0.0.1:8069"));
        assert!(app.contains("http_port = 8069"));
        assert!(proxy.contains("127.0.0.1:8072"));
        assert!(app.contains("longpolling_port = 8072"));
    }

    #[test]
    fn proxy_forwards_upgrade_headers_on_longpoll_path() {
        let proxy = render(TemplateKind::ReverseProxy, &test_params()).unwrap();
        assert!(proxy.contains("location /longpolling"));
        assert!(proxy.contains("proxy_set_header Upgrade $http_upgrade"));
        assert!(proxy.contains("proxy_set_header Connection \"upgrade\""));
        assert!(proxy.contains("proxy_set_header X-Forwarded-Proto $scheme"));
        assert!(proxy.contains("client_max_body_size 128m"));
        assert!(proxy.contains("proxy_read_timeout 720s"));
    }

    #[test]
    fn plain_http_omits_tls_blocks() {
        let proxy = render(TemplateKind::ReverseProxy, &test_params()).unwrap();
        assert!(proxy.contains("listen 80;"));
        assert!(!proxy.contains("ssl_certificate"));
        assert!(!proxy.contains("return 301"));
    }

    #[test]
    fn tls_adds_redirect_and_certificate_paths() {
        let mut params = test_params();
        params.enable_tls = true;
        params.public_port = 443;

        let proxy = render(TemplateKind::ReverseProxy, &params).unwrap();
        assert!(proxy.contains("listen 443 ssl;"));
        assert!(proxy.contains("return 301 https://$host$request_uri;"));
        assert!(proxy.contains("/etc/letsencrypt/live/erp.example.com/fullchain.pem"));
        assert!(proxy.contains("/etc/letsencrypt/live/erp.example.com/privkey.pem"));
    }

    #[test]
    fn unit_points_at_venv_and_generated_config() {
        let unit = render(TemplateKind::ServiceUnit, &test_params()).unwrap();
        assert!(unit.contains("After=network-online.target postgresql.service"));
        assert!(unit.contains("User=erp"));
        assert!(unit.contains("Restart=on-failure"));
        assert!(unit.contains(
            "ExecStart=/opt/erp/venv/bin/python3 /opt/erp/src/odoo-bin -c /etc/erp.conf"
        ));
    }

    #[test]
    fn app_config_ties_workers_and_proxy_mode() {
        let mut params = test_params();
        params.workers = 5;
        let app = render(TemplateKind::AppConfig, &params).unwrap();
        assert!(app.contains("workers = 5"));
        assert!(app.contains("proxy_mode = True"));
        assert!(app.contains("logfile = /var/log/erp/erp.log"));
    }

    #[test]
    fn empty_db_password_is_omitted_not_interpolated() {
        let app = render(TemplateKind::AppConfig, &test_params()).unwrap();
        assert!(!app.contains("db_password"));

        let mut params = test_params();
        params.db_password = "hunter2".to_string();
        let app = render(TemplateKind::AppConfig, &params).unwrap();
        assert!(app.contains("db_password = hunter2"));
    }

    #[test]
    fn missing_required_field_never_renders() {
        let mut params = test_params();
        params.domain = "   ".to_string();

        let err = render(TemplateKind::ReverseProxy, &params).unwrap_err();
        match err {
            RenderError::MissingParameter { kind, field } => {
                assert_eq!(kind, "reverse-proxy");
                assert_eq!(field, "domain");
            }
            other => panic!("expected MissingParameter, got {other}"),
        }
    }

    #[test]
    fn missing_log_level_is_caught_for_app_config() {
        let mut params = test_params();
        params.log_level = String::new();

        let err = render(TemplateKind::AppConfig, &params).unwrap_err();
        assert!(matches!(
            err,
            RenderError::MissingParameter {
                field: "log_level",
                ..
            }
        ));
    }
}
