//! `tierstack init` - write a starter config and lookup context

use anyhow::{Context as AnyhowContext, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use topology::{CONTEXT_FILE, LookupContext, StackConfig};

use crate::Context;
use crate::paths::{CONFIG_FILE, expand_path};
use crate::ui;

pub fn run(ctx: &Context, force: bool) -> Result<()> {
    let cwd = std::env::current_dir().context("Could not determine current directory")?;
    let config_path = ctx
        .config
        .as_deref()
        .map_or_else(|| cwd.join(CONFIG_FILE), |p| expand_path(p, &cwd));

    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    let content = StackConfig::default().to_toml_string()?;
    write_file(&config_path, &content)?;
    ui::success(&format!("Created {}", config_path.display()));

    let context_path = context_path(ctx, &cwd, &config_path);
    if context_path.exists() {
        ui::dim(&format!("Keeping existing {}", context_path.display()));
    } else {
        write_file(&context_path, &LookupContext::default().to_json_string()?)?;
        ui::success(&format!("Created {}", context_path.display()));
    }

    println!();
    ui::info(&format!(
        "Record your default network and hosted zone in {}, then run `tierstack doctor`",
        context_path.display()
    ));
    Ok(())
}

fn context_path(ctx: &Context, cwd: &Path, config_path: &Path) -> PathBuf {
    if let Some(path) = &ctx.context {
        return expand_path(path, cwd);
    }
    config_path
        .parent()
        .map_or_else(|| cwd.join(CONTEXT_FILE), |dir| dir.join(CONTEXT_FILE))
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Could not create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Could not write {}", path.display()))
}
