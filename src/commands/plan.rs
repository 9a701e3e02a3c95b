//! `tierstack plan` - list declared resources in order

use anyhow::Result;
use colored::Colorize;
use declarative::render_properties;

use crate::Context;
use crate::cli::PlanArgs;
use crate::commands::compose_stack;
use crate::ui;

pub fn run(ctx: &Context, args: &PlanArgs) -> Result<()> {
    let topology = compose_stack(ctx, args.mode)?;
    let plan = topology.to_plan()?.filter_by_target(args.target.as_deref());

    ui::header(&format!("{} ({})", topology.stack_name, topology.mode()));
    ui::kv("target", &topology.target.to_string());
    ui::kv("network", &topology.network.vpc_id);
    ui::kv("hostname", &topology.service.hostname);

    if plan.is_empty() {
        println!();
        ui::info("No resources match the target filter");
        return Ok(());
    }

    ui::section(&format!("Resources ({})", plan.total_resources()));
    for (i, resource) in plan.resources().iter().enumerate() {
        println!(
            "  {} {} {}",
            format!("{:>2}.", i + 1).dimmed(),
            resource.id().bold(),
            resource.resource_type().dimmed()
        );
        println!("      {}", resource.description());

        let deps = resource.dependencies();
        if !deps.is_empty() {
            println!("      {} {}", "depends on".dimmed(), deps.join(", "));
        }
        if resource.removal_policy().is_some() {
            println!(
                "      {} {}",
                "on teardown".dimmed(),
                ui::policy_label(resource.removal_policy())
            );
        }

        if ctx.verbose > 0 {
            for line in render_properties(&resource.properties()).lines() {
                println!("        {}", line.dimmed());
            }
        }
    }

    println!();
    ui::dim(&format!(
        "Grant: {} -> {} on port {}",
        topology.grant.source_id, topology.grant.target_id, topology.grant.port
    ));
    Ok(())
}
