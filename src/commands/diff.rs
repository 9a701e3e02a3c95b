//! `tierstack diff` - compare the composed stack with a synthesized template

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use declarative::{Change, DiffSummary, ResourceDiff, compute_diffs, render_properties};
use topology::template;

use crate::Context;
use crate::cli::DiffArgs;
use crate::commands::compose_stack;
use crate::ui;

pub fn run(ctx: &Context, args: &DiffArgs) -> Result<()> {
    let old = template::load_plan(&args.against)
        .with_context(|| format!("Could not load {}", args.against.display()))?;
    let topology = compose_stack(ctx, args.mode)?;
    let new = topology.to_plan()?;

    let diffs = compute_diffs(&old, &new);
    let summary = DiffSummary::from_diffs(&diffs);

    ui::header(&format!(
        "{} vs {}",
        topology.stack_name,
        args.against.display()
    ));

    if !summary.has_changes() {
        println!();
        ui::success("No changes");
        return Ok(());
    }

    for diff in &diffs {
        print_diff(diff);
    }

    println!();
    println!(
        "  {} to add, {} to change ({} replaced), {} to remove",
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.replacements,
        summary.removals.to_string().red()
    );
    Ok(())
}

fn print_diff(diff: &ResourceDiff) {
    println!();
    let kind = diff.resource_type.dimmed();
    match &diff.change {
        Change::Added => println!("{} {} {kind}", "+".green().bold(), diff.resource_id.green()),
        Change::Removed => println!("{} {} {kind}", "-".red().bold(), diff.resource_id.red()),
        Change::Modified {
            properties,
            removal_policy,
            dependencies,
            replaced,
        } => {
            let marker = if *replaced { "±".red() } else { "~".yellow() };
            println!("{} {} {kind}", marker.bold(), diff.resource_id.yellow());
            if *replaced {
                ui::warn("type changed, resource will be replaced");
            }
            if let Some((before, after)) = removal_policy {
                println!(
                    "    teardown: {} -> {}",
                    ui::policy_label(*before),
                    ui::policy_label(*after)
                );
            }
            if *dependencies {
                ui::dim("dependencies changed");
            }
            if !properties.is_empty() {
                ui::dim(&format!("properties: {}", properties.join(", ")));
            }
            if let (Some(old), Some(new)) = (&diff.old, &diff.new) {
                ui::text_diff(&render_properties(old), &render_properties(new));
            }
        }
    }
}
