use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;
use topology::backend::Backend;
use topology::types::{ACCOUNT_ENV, ImageSource, REGION_ENV};
use topology::{
    ContextBackend, DeployTarget, LookupContext, NetworkLookup, StackConfig, SubnetGroup,
};

use crate::Context;
use crate::commands::deploy_target;
use crate::paths::{CONFIG_FILE, Project};
use crate::ui;

struct Issue {
    category: &'static str,
    summary: String,
    detail: Option<String>,
    fix: Option<String>,
    fix_cmd: Option<String>,
}

pub fn run(ctx: &Context) -> Result<()> {
    ui::header("Stack Health Check");

    let mut issues: Vec<Issue> = Vec::new();

    // Check 1: Deployment target
    let target = check_target(ctx, &mut issues);

    // Check 2: Configuration
    let Some((project, config)) = check_config(ctx, &mut issues) else {
        print_summary(&issues);
        return Ok(());
    };

    // Check 3: Build files (no lookups involved)
    let backend = ContextBackend::from_context(&project.context_path, LookupContext::default());
    check_build_files(&backend, &project, &config, &mut issues);

    // Check 4: Lookups (need an account and region)
    if let Some(target) = &target {
        check_lookups(&project, &config, target, &mut issues);
    }

    print_summary(&issues);
    Ok(())
}

fn ok(label: &str, detail: &str) {
    println!("  {} {} - {}", "✓".green(), label, detail.dimmed());
}

fn fail(label: &str, detail: &str) {
    println!("  {} {} - {}", "✗".red(), label, detail.red());
}

fn print_summary(issues: &[Issue]) {
    println!();
    if issues.is_empty() {
        ui::success("Ready to synthesize");
        return;
    }

    let count = issues.len();
    let label = if count == 1 { "Issue" } else { "Issues" };
    ui::header(&format!("{count} {label} Found"));

    for (i, issue) in issues.iter().enumerate() {
        println!(
            "  {}  {} {}",
            format!("{}.", i + 1).bold(),
            issue.summary,
            format!("[{}]", issue.category).dimmed()
        );
        if let Some(detail) = &issue.detail {
            for line in detail.lines() {
                println!("      {}", line.dimmed());
            }
        }
        if let Some(fix) = &issue.fix {
            println!("      {} {}", "Fix:".cyan(), fix);
        }
        if let Some(cmd) = &issue.fix_cmd {
            println!("      {} {}", "$".dimmed(), cmd.bold());
        }
        println!();
    }
}

fn check_target(ctx: &Context, issues: &mut Vec<Issue>) -> Option<DeployTarget> {
    ui::section("Deployment Target");

    match deploy_target(ctx) {
        Ok(target) => {
            ok(ACCOUNT_ENV, &target.account);
            ok(REGION_ENV, &target.region);
            Some(target)
        }
        Err(e) => {
            let reason = e.root_cause().to_string();
            fail("target", &reason);
            let variable = if ctx.account.is_none() {
                ACCOUNT_ENV
            } else {
                REGION_ENV
            };
            issues.push(Issue {
                category: "Deployment Target",
                summary: reason,
                detail: Some("Network and DNS lookups are account/region specific".into()),
                fix: Some(format!("Export {variable} or pass --account/--region")),
                fix_cmd: Some(format!("export {variable}=...")),
            });
            None
        }
    }
}

fn check_config(ctx: &Context, issues: &mut Vec<Issue>) -> Option<(Project, StackConfig)> {
    ui::section("Configuration");

    let project = match Project::locate(ctx.config.as_deref(), ctx.context.as_deref()) {
        Ok(project) => project,
        Err(e) => {
            fail("config", &format!("{e:#}"));
            issues.push(Issue {
                category: "Configuration",
                summary: format!("{e:#}"),
                detail: None,
                fix: Some("Point --config at an existing file or create one".into()),
                fix_cmd: Some("tierstack init".into()),
            });
            return None;
        }
    };

    let label = project
        .config_path
        .as_ref()
        .map_or_else(|| CONFIG_FILE.to_string(), |p| p.display().to_string());

    match project.load_config() {
        Ok(config) => {
            let detail = if project.config_path.is_some() {
                "valid"
            } else {
                "not found, using built-in defaults"
            };
            ok(&label, detail);
            ok("stack", &config.stack.app_name);
            ok("hostname", &config.domain.hostname);
            Some((project, config))
        }
        Err(e) => {
            let reason = e.root_cause().to_string();
            fail(&label, &reason);
            issues.push(Issue {
                category: "Configuration",
                summary: format!("{label} is invalid"),
                detail: Some(reason),
                fix: Some(format!("Edit {label} and fix the issue")),
                fix_cmd: Some(format!("$EDITOR {label}")),
            });
            None
        }
    }
}

fn check_build_files(
    backend: &ContextBackend,
    project: &Project,
    config: &StackConfig,
    issues: &mut Vec<Issue>,
) {
    ui::section("Build Files");

    let context = config.compute.build_context_path(&project.root);
    for (container, file) in [
        (&config.compute.edge.name, &config.compute.edge.build_file),
        (&config.compute.runtime.name, &config.compute.runtime.build_file),
    ] {
        let source = ImageSource {
            container: container.clone(),
            context: context.clone(),
            file: PathBuf::from(file),
        };
        match backend.resolve_image(&source) {
            Ok(image) => ok(
                container,
                &format!("{} ({})", file, ui::short_hash(&image.asset_hash)),
            ),
            Err(e) => {
                fail(container, &e.to_string());
                issues.push(Issue {
                    category: "Build Files",
                    summary: format!("Image for {container} cannot be built"),
                    detail: Some(e.to_string()),
                    fix: Some(e.category().advice().to_string()),
                    fix_cmd: None,
                });
            }
        }
    }
}

fn check_lookups(
    project: &Project,
    config: &StackConfig,
    target: &DeployTarget,
    issues: &mut Vec<Issue>,
) {
    ui::section("Lookups");

    let backend = match ContextBackend::load(&project.context_path) {
        Ok(backend) => {
            ok(&project.context_path.display().to_string(), "loaded");
            backend
        }
        Err(e) => {
            fail(&project.context_path.display().to_string(), &e.to_string());
            issues.push(Issue {
                category: "Lookups",
                summary: "Lookup context unavailable".into(),
                detail: Some(e.to_string()),
                fix: Some("Record the default network and hosted zone for this account".into()),
                fix_cmd: None,
            });
            return;
        }
    };

    match backend.lookup_network(target, &NetworkLookup::default_network()) {
        Ok(Some(network)) => {
            let public = network.subnets(SubnetGroup::Public).len();
            if public == 0 {
                fail(&network.vpc_id, "no public subnets");
                issues.push(Issue {
                    category: "Lookups",
                    summary: format!("Network {} has no public subnets", network.vpc_id),
                    detail: Some(
                        "The database and the service are placed in public subnets".into(),
                    ),
                    fix: None,
                    fix_cmd: None,
                });
            } else {
                ok(&network.vpc_id, &format!("default network, {public} public subnets"));
            }
        }
        Ok(None) | Err(_) => {
            fail("network", &format!("no default network for {target}"));
            issues.push(Issue {
                category: "Lookups",
                summary: format!("No default network recorded for {target}"),
                detail: None,
                fix: Some(format!(
                    "Add a networks entry to {}",
                    project.context_path.display()
                )),
                fix_cmd: None,
            });
        }
    }

    let domain = &config.domain.root_domain;
    match backend.lookup_zone(target, domain) {
        Ok(Some(zone)) => ok(&zone.name, &zone.zone_id),
        Ok(None) | Err(_) => {
            fail(domain, "no hosted zone");
            issues.push(Issue {
                category: "Lookups",
                summary: format!("No hosted zone recorded for {domain}"),
                detail: None,
                fix: Some(format!(
                    "Add a hosted_zones entry to {}",
                    project.context_path.display()
                )),
                fix_cmd: None,
            });
        }
    }
}
