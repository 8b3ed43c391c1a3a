//! The provisioning step catalog
//!
//! Declares every step of the deployment with its resource
//! precondition and prerequisites. Declaration order here is the
//! tie-break order the planner preserves, so steps are listed in the
//! order an operator would naturally read them.
//!
//! Reload and restart steps are gated on stamp files under the state
//! directory, pinned to the digests of the artifacts last loaded: a
//! rewritten artifact changes the stamp digest, so the next run
//! reloads, while a converged host skips the reload entirely.

use anyhow::Result;
use convergence::{Resource, ResourceKind, Step};

use crate::actions::{CommandAction, LinkAction, SequenceAction, WriteFileAction};
use crate::config::ProvisionParams;
use crate::probe::filesystem::content_digest;
use crate::render::{TemplateKind, render};

fn package_step_name(package: &str) -> String {
    format!("install-package-{package}")
}

/// Prerequisite on a package step, but only when the catalog manages
/// that package; operators may trim the package list
fn package_dep(params: &ProvisionParams, package: &str) -> Option<String> {
    params
        .system_packages
        .iter()
        .any(|p| p == package)
        .then(|| package_step_name(package))
}

fn file_resource(path: std::path::PathBuf, contents: &str) -> Resource {
    Resource::new(
        ResourceKind::File {
            digest: Some(content_digest(contents)),
        },
        path.display().to_string(),
    )
}

/// Build the full step list for one parameter set.
///
/// Rendering happens here, up front: a missing template parameter
/// fails the whole run before a single step executes.
pub fn build(params: &ProvisionParams) -> Result<Vec<Step>> {
    let mut steps: Vec<Step> = Vec::new();

    // Base system packages, one step each so converged hosts skip
    // package-by-package.
    for package in &params.system_packages {
        steps.push(Step::new(
            package_step_name(package),
            Resource::new(ResourceKind::Package, package),
            Box::new(CommandAction::new(
                "apt-get",
                ["install", "-y", package.as_str()],
            )),
        ));
    }

    steps.push(Step::new(
        "install-database",
        Resource::new(ResourceKind::Package, "postgresql"),
        Box::new(CommandAction::new("apt-get", ["install", "-y", "postgresql"])),
    ));

    steps.push(Step::new(
        "install-proxy",
        Resource::new(ResourceKind::Package, "nginx"),
        Box::new(CommandAction::new("apt-get", ["install", "-y", "nginx"])),
    ));

    let install_dir = params.install_dir.display().to_string();
    steps.push(Step::new(
        "create-service-user",
        Resource::new(ResourceKind::User, &params.service_user),
        Box::new(CommandAction::new(
            "useradd",
            [
                "--system",
                "--home-dir",
                install_dir.as_str(),
                "--user-group",
                "--shell",
                "/bin/bash",
                params.service_user.as_str(),
            ],
        )),
    ));

    steps.push(
        Step::new(
            "create-install-dir",
            Resource::new(ResourceKind::Directory, &install_dir),
            Box::new(CommandAction::new(
                "install",
                [
                    "-d",
                    "-o",
                    params.service_user.as_str(),
                    "-g",
                    params.service_user.as_str(),
                    install_dir.as_str(),
                ],
            )),
        )
        .requires("create-service-user"),
    );

    let log_dir = params.log_dir().display().to_string();
    steps.push(
        Step::new(
            "create-log-dir",
            Resource::new(ResourceKind::Directory, &log_dir),
            Box::new(CommandAction::new(
                "install",
                [
                    "-d",
                    "-o",
                    params.service_user.as_str(),
                    "-g",
                    params.service_user.as_str(),
                    log_dir.as_str(),
                ],
            )),
        )
        .requires("create-service-user"),
    );

    steps.push(
        Step::new(
            "create-db-role",
            Resource::new(ResourceKind::DatabaseRole, &params.db_user),
            Box::new(CommandAction::new(
                "runuser",
                [
                    "-u",
                    "postgres",
                    "--",
                    "createuser",
                    "--createdb",
                    params.db_user.as_str(),
                ],
            )),
        )
        .requires("install-database"),
    );

    let source_dir = params.source_dir().display().to_string();
    steps.push(
        Step::new(
            "clone-source",
            Resource::new(ResourceKind::VcsClone, &source_dir),
            Box::new(CommandAction::new(
                "git",
                [
                    "clone",
                    "--depth",
                    "1",
                    "--branch",
                    params.source_branch.as_str(),
                    params.source_url.as_str(),
                    source_dir.as_str(),
                ],
            )),
        )
        .requires("create-install-dir")
        .requires_all(package_dep(params, "git")),
    );

    // Converged only when the stamp the final action writes is there:
    // a run halted mid-sequence leaves the venv directory present but
    // incomplete, and the directory alone must not skip the step.
    let venv_dir = params.venv_dir().display().to_string();
    let pip = format!("{venv_dir}/bin/pip");
    let requirements = format!("{source_dir}/requirements.txt");
    let venv_stamp = format!("venv {venv_dir}\n");
    steps.push(
        Step::new(
            "create-venv",
            file_resource(params.venv_stamp_path(), &venv_stamp),
            Box::new(SequenceAction::new(
                &format!("create virtual environment in {venv_dir}"),
                vec![
                    Box::new(CommandAction::new(
                        "python3",
                        ["-m", "venv", venv_dir.as_str()],
                    )),
                    Box::new(CommandAction::new(
                        &pip,
                        ["install", "--upgrade", "pip", "wheel"],
                    )),
                    Box::new(CommandAction::new(&pip, ["install", "-r", requirements.as_str()])),
                    Box::new(WriteFileAction::new(params.venv_stamp_path(), venv_stamp)),
                ],
            )),
        )
        .requires("clone-source")
        .requires_all(package_dep(params, "python3-venv")),
    );

    let app_config = render(TemplateKind::AppConfig, params)?;
    let app_digest = content_digest(&app_config);
    steps.push(
        Step::new(
            "write-app-config",
            file_resource(params.app_config_path(), &app_config),
            Box::new(
                WriteFileAction::new(params.app_config_path(), app_config)
                    .with_mode(0o640)
                    .with_owner(&params.service_user),
            ),
        )
        .requires("create-service-user")
        .requires("create-log-dir"),
    );

    let proxy_config = render(TemplateKind::ReverseProxy, params)?;
    let proxy_digest = content_digest(&proxy_config);

    if params.enable_tls {
        // The TLS site references a certificate that does not exist on
        // a fresh host, and the proxy refuses to load a config naming
        // a missing certificate. Bring up a plain-HTTP site first,
        // obtain the certificate against it, then switch the site
        // over. Existence-only precondition: any site file, HTTP or
        // TLS, counts as bootstrapped.
        let mut http_params = params.clone();
        http_params.enable_tls = false;
        http_params.public_port = 80;
        let http_config = render(TemplateKind::ReverseProxy, &http_params)?;

        steps.push(
            Step::new(
                "bootstrap-proxy-config",
                Resource::new(
                    ResourceKind::File { digest: None },
                    params.proxy_site_path().display().to_string(),
                ),
                Box::new(WriteFileAction::new(params.proxy_site_path(), http_config)),
            )
            .requires("install-proxy"),
        );
    } else {
        steps.push(
            Step::new(
                "write-proxy-config",
                file_resource(params.proxy_site_path(), &proxy_config),
                Box::new(WriteFileAction::new(
                    params.proxy_site_path(),
                    proxy_config.clone(),
                )),
            )
            .requires("install-proxy"),
        );
    }

    steps.push(
        Step::new(
            "enable-proxy-site",
            Resource::new(
                ResourceKind::File { digest: None },
                params.proxy_link_path().display().to_string(),
            ),
            Box::new(LinkAction::new(
                params.proxy_site_path(),
                params.proxy_link_path(),
            )),
        )
        .requires(if params.enable_tls {
            "bootstrap-proxy-config"
        } else {
            "write-proxy-config"
        }),
    );

    steps.push(
        Step::new(
            "enable-proxy",
            Resource::new(ResourceKind::Service, "nginx"),
            Box::new(CommandAction::new(
                "systemctl",
                ["enable", "--now", "nginx"],
            )),
        )
        .requires("enable-proxy-site"),
    );

    if params.enable_tls {
        steps.push(Step::new(
            "install-certbot",
            Resource::new(ResourceKind::Package, "certbot"),
            Box::new(CommandAction::new(
                "apt-get",
                ["install", "-y", "certbot", "python3-certbot-nginx"],
            )),
        ));

        // certonly: certbot must not edit the site config itself; the
        // TLS site is written from the template once the files exist.
        steps.push(
            Step::new(
                "issue-certificate",
                Resource::new(
                    ResourceKind::File { digest: None },
                    params.certificate_path().display().to_string(),
                ),
                Box::new(CommandAction::new(
                    "certbot",
                    [
                        "certonly",
                        "--nginx",
                        "--non-interactive",
                        "--agree-tos",
                        "-d",
                        params.domain.as_str(),
                        "-m",
                        params.admin_email.as_str(),
                    ],
                )),
            )
            .requires("install-certbot")
            .requires("enable-proxy"),
        );

        steps.push(
            Step::new(
                "write-proxy-config",
                file_resource(params.proxy_site_path(), &proxy_config),
                Box::new(WriteFileAction::new(params.proxy_site_path(), proxy_config)),
            )
            .requires("issue-certificate"),
        );
    }

    let proxy_stamp = format!("site {proxy_digest}\n");
    steps.push(
        Step::new(
            "reload-proxy",
            file_resource(params.proxy_stamp_path(), &proxy_stamp),
            Box::new(SequenceAction::new(
                "reload the reverse proxy",
                vec![
                    Box::new(CommandAction::new(
                        "systemctl",
                        ["reload-or-restart", "nginx"],
                    )),
                    Box::new(WriteFileAction::new(params.proxy_stamp_path(), proxy_stamp)),
                ],
            )),
        )
        .requires("write-proxy-config")
        .requires("enable-proxy"),
    );

    let unit = render(TemplateKind::ServiceUnit, params)?;
    let unit_digest = content_digest(&unit);
    steps.push(
        Step::new(
            "write-service-unit",
            file_resource(params.unit_path(), &unit),
            Box::new(WriteFileAction::new(params.unit_path(), unit)),
        )
        .requires("write-app-config"),
    );

    steps.push(
        Step::new(
            "enable-service",
            Resource::new(ResourceKind::Service, &params.service_name),
            Box::new(SequenceAction::new(
                "enable the application service",
                vec![
                    Box::new(CommandAction::new("systemctl", ["daemon-reload"])),
                    Box::new(CommandAction::new(
                        "systemctl",
                        ["enable", params.service_name.as_str()],
                    )),
                ],
            )),
        )
        .requires("write-service-unit")
        .requires("create-db-role")
        .requires("create-venv"),
    );

    // Starts the service on a fresh host and restarts it whenever the
    // unit or app config was rewritten since the stamp was last laid.
    let service_stamp = format!("unit {unit_digest}\nconfig {app_digest}\n");
    steps.push(
        Step::new(
            "restart-service",
            file_resource(params.service_stamp_path(), &service_stamp),
            Box::new(SequenceAction::new(
                "restart the application service",
                vec![
                    Box::new(CommandAction::new("systemctl", ["daemon-reload"])),
                    Box::new(CommandAction::new(
                        "systemctl",
                        ["restart", params.service_name.as_str()],
                    )),
                    Box::new(WriteFileAction::new(
                        params.service_stamp_path(),
                        service_stamp,
                    )),
                ],
            )),
        )
        .requires("enable-service"),
    );

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_params;
    use convergence::plan;
    use std::collections::HashSet;

    fn positions(ordered: &[Step]) -> impl Fn(&str) -> usize + '_ {
        move |name: &str| {
            ordered
                .iter()
                .position(|s| s.name == name)
                .unwrap_or_else(|| panic!("no step named {name}"))
        }
    }

    #[test]
    fn catalog_plans_cleanly() {
        let steps = build(&test_params()).unwrap();
        let ordered = plan(steps).unwrap();
        let pos = positions(&ordered);

        assert!(pos("install-proxy") < pos("write-proxy-config"));
        assert!(pos("write-proxy-config") < pos("enable-proxy-site"));
        assert!(pos("enable-proxy-site") < pos("enable-proxy"));
        assert!(pos("enable-proxy") < pos("reload-proxy"));
        assert!(pos("create-install-dir") < pos("clone-source"));
        assert!(pos("clone-source") < pos("create-venv"));
        assert!(pos("write-app-config") < pos("write-service-unit"));
        assert!(pos("write-service-unit") < pos("enable-service"));
        assert!(pos("enable-service") < pos("restart-service"));
        assert!(pos("create-db-role") < pos("enable-service"));
    }

    #[test]
    fn step_names_are_unique() {
        let steps = build(&test_params()).unwrap();
        let names: HashSet<&str> = steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), steps.len());
    }

    #[test]
    fn tls_adds_certificate_steps() {
        let plain = build(&test_params()).unwrap();
        assert!(!plain.iter().any(|s| s.name == "issue-certificate"));
        assert!(!plain.iter().any(|s| s.name == "bootstrap-proxy-config"));

        let mut params = test_params();
        params.enable_tls = true;
        let tls = build(&params).unwrap();
        assert!(tls.iter().any(|s| s.name == "install-certbot"));
        assert!(tls.iter().any(|s| s.name == "issue-certificate"));
        assert!(plan(tls).is_ok());
    }

    #[test]
    fn certificate_is_issued_before_tls_site_is_loaded() {
        let mut params = test_params();
        params.enable_tls = true;
        let ordered = plan(build(&params).unwrap()).unwrap();
        let pos = positions(&ordered);

        // Fresh-host bootstrap: plain-HTTP site up, certificate issued
        // against it, only then the certificate-referencing site
        // written and reloaded.
        assert!(pos("bootstrap-proxy-config") < pos("enable-proxy"));
        assert!(pos("enable-proxy") < pos("issue-certificate"));
        assert!(pos("issue-certificate") < pos("write-proxy-config"));
        assert!(pos("write-proxy-config") < pos("reload-proxy"));

        // The bootstrap site counts as satisfied by any existing site
        // file, so converged TLS hosts never fall back to HTTP.
        let bootstrap = ordered
            .iter()
            .find(|s| s.name == "bootstrap-proxy-config")
            .unwrap();
        assert!(matches!(
            &bootstrap.resource.kind,
            ResourceKind::File { digest: None }
        ));
    }

    #[test]
    fn changed_artifacts_change_the_reload_and_restart_stamps() {
        let digest_of = |steps: &[Step], name: &str| {
            let step = steps.iter().find(|s| s.name == name).unwrap();
            match &step.resource.kind {
                ResourceKind::File { digest } => digest.clone().unwrap(),
                other => panic!("{name} gated on {other:?}, not a stamp file"),
            }
        };

        let before = build(&test_params()).unwrap();

        let mut tweaked = test_params();
        tweaked.workers = 99;
        tweaked.max_body_size = "256m".to_string();
        let after = build(&tweaked).unwrap();

        // A rewritten artifact must force the reload/restart on the
        // next run instead of being skipped behind an enabled service.
        assert_ne!(
            digest_of(&before, "restart-service"),
            digest_of(&after, "restart-service")
        );
        assert_ne!(
            digest_of(&before, "reload-proxy"),
            digest_of(&after, "reload-proxy")
        );
    }

    #[test]
    fn enablement_is_probed_separately_from_loaded_config() {
        let steps = build(&test_params()).unwrap();
        for name in ["enable-proxy", "enable-service"] {
            let step = steps.iter().find(|s| s.name == name).unwrap();
            assert!(matches!(step.resource.kind, ResourceKind::Service));
        }
    }

    #[test]
    fn venv_converges_on_completion_stamp_not_directory() {
        let steps = build(&test_params()).unwrap();
        let venv = steps.iter().find(|s| s.name == "create-venv").unwrap();

        // A halted run leaves the venv directory present but without
        // requirements; only the stamp the final action writes may
        // satisfy the precondition.
        match &venv.resource.kind {
            ResourceKind::File { digest } => assert!(digest.is_some()),
            other => panic!("create-venv gated on {other:?}"),
        }
        assert!(venv.resource.id.ends_with("venv.ok"));
    }

    #[test]
    fn trimmed_package_list_still_plans() {
        let mut params = test_params();
        params.system_packages = vec!["build-essential".to_string()];

        let steps = build(&params).unwrap();
        // clone-source must not require a git package step the
        // catalog no longer manages.
        assert!(plan(steps).is_ok());
    }

    #[test]
    fn artifact_steps_pin_content_digests() {
        let steps = build(&test_params()).unwrap();
        for name in ["write-app-config", "write-proxy-config", "write-service-unit"] {
            let step = steps.iter().find(|s| s.name == name).unwrap();
            match &step.resource.kind {
                ResourceKind::File { digest } => {
                    assert!(digest.is_some(), "{name} should pin a digest")
                }
                other => panic!("{name} has unexpected kind {other:?}"),
            }
        }
    }
}
