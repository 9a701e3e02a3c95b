//! `tierstack synth` - compose the stack and render its template

use anyhow::{Context as AnyhowContext, Result, bail};
use colored::Colorize;
use declarative::{ApplyResult, ProgressCallback};
use dialoguer::Confirm;
use std::fs;
use std::io::IsTerminal;
use std::path::Path;
use topology::template;

use crate::Context;
use crate::cli::SynthArgs;
use crate::commands::compose_stack;
use crate::ui;

/// Prints one line per rendered resource
struct SynthProgress {
    total: usize,
    current: usize,
    enabled: bool,
}

impl SynthProgress {
    fn new(enabled: bool) -> Self {
        Self {
            total: 0,
            current: 0,
            enabled,
        }
    }
}

impl ProgressCallback for SynthProgress {
    fn on_plan_start(&mut self, count: usize) {
        self.total = count;
    }

    fn on_resource_start(&mut self, _id: &str, _description: &str) {
        self.current += 1;
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
        if !self.enabled {
            return;
        }
        match result {
            ApplyResult::Failed { error } => {
                ui::step(self.current, self.total, &format!("{} {}", id.red(), error));
            }
            ApplyResult::Created => ui::step(self.current, self.total, id),
        }
    }

    fn on_plan_complete(&mut self) {}
}

pub fn run(ctx: &Context, args: &SynthArgs) -> Result<()> {
    let topology = compose_stack(ctx, args.mode)?;
    let plan = topology.to_plan()?;

    // Progress lines only when writing to a file; stdout carries the template
    let mut progress = SynthProgress::new(args.out.is_some() && !ctx.quiet);
    let doc = template::render_with(&plan, &topology.metadata(), &mut progress)?;
    let fingerprint = template::fingerprint(&doc)?;
    let rendered = serde_json::to_string_pretty(&doc)?;

    let Some(out) = &args.out else {
        println!("{rendered}");
        return Ok(());
    };

    if out.exists() && !args.force && !confirm_overwrite(out)? {
        ui::info("Aborted, template not written");
        return Ok(());
    }

    fs::write(out, format!("{rendered}\n"))
        .with_context(|| format!("Could not write {}", out.display()))?;

    if !ctx.quiet {
        ui::success(&format!(
            "{} written to {}",
            topology.stack_name.bold(),
            out.display()
        ));
        ui::kv("resources", &plan.total_resources().to_string());
        ui::kv("mode", topology.mode().name());
        ui::kv("target", &topology.target.to_string());
        ui::kv("fingerprint", ui::short_hash(&fingerprint));
        if topology.profile.is_destructive() {
            ui::warn("Database is destroyed with the stack and automated backups are deleted");
        }
    }
    Ok(())
}

fn confirm_overwrite(path: &Path) -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    Confirm::new()
        .with_prompt(format!("Overwrite {}?", path.display()))
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}
