//! Locating the project: config file, project root and lookup context
//!
//! # Resolution Priority
//!
//! For the config file:
//! 1. `--config` / `TIERSTACK_CONFIG`
//! 2. `tierstack.toml` in the current directory or any parent
//! 3. `tierstack/tierstack.toml` in the platform config directory
//!    (`~/.config/tierstack` on Linux)
//! 4. None: the built-in defaults are used
//!
//! The project root is the directory holding the config file (or the
//! current directory when there is none). The lookup context defaults to
//! `tierstack.context.json` in the project root.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use topology::{CONTEXT_FILE, StackConfig};

/// File name of the stack configuration
pub const CONFIG_FILE: &str = "tierstack.toml";

/// Resolved project layout
#[derive(Debug, Clone)]
pub struct Project {
    /// Config file, if one was found
    pub config_path: Option<PathBuf>,
    /// Directory build contexts are resolved against
    pub root: PathBuf,
    /// Lookup context file
    pub context_path: PathBuf,
}

impl Project {
    /// Locate the project from the current directory
    pub fn locate(config: Option<&Path>, context: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().context("Could not determine current directory")?;
        Self::locate_from(&cwd, config, context, global_config_file())
    }

    fn locate_from(
        cwd: &Path,
        config: Option<&Path>,
        context: Option<&Path>,
        global: Option<PathBuf>,
    ) -> Result<Self> {
        let config_path = match config {
            Some(path) => {
                let path = expand_path(path, cwd);
                if !path.is_file() {
                    bail!("Config file not found: {}", path.display());
                }
                Some(path)
            }
            None => find_upwards(cwd, CONFIG_FILE).or(global.filter(|p| p.is_file())),
        };

        let root = config_path
            .as_deref()
            .and_then(Path::parent)
            .map_or_else(|| cwd.to_path_buf(), Path::to_path_buf);

        let context_path = context.map_or_else(
            || root.join(CONTEXT_FILE),
            |path| expand_path(path, cwd),
        );

        log::debug!(
            "project root {}, config {}, context {}",
            root.display(),
            config_path
                .as_deref()
                .map_or_else(|| "(defaults)".to_string(), |p| p.display().to_string()),
            context_path.display()
        );

        Ok(Self {
            config_path,
            root,
            context_path,
        })
    }

    /// Load the stack configuration, falling back to defaults
    pub fn load_config(&self) -> Result<StackConfig> {
        match &self.config_path {
            Some(path) => StackConfig::load(path)
                .with_context(|| format!("Could not load {}", path.display())),
            None => {
                log::info!("no {CONFIG_FILE} found, using built-in defaults");
                Ok(StackConfig::default())
            }
        }
    }
}

/// `tierstack/tierstack.toml` in the platform config directory
fn global_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tierstack").join(CONFIG_FILE))
}

/// Search `start` and its ancestors for `name`
fn find_upwards(start: &Path, name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Expand `~` and make relative paths absolute against `base`
pub fn expand_path(path: &Path, base: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let path = PathBuf::from(expanded);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
