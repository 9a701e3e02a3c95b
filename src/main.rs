mod cli;
mod commands;
mod paths;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
#[derive(Debug, Default)]
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: Option<PathBuf>,
    pub context: Option<PathBuf>,
    pub account: Option<String>,
    pub region: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Err(err) = run(cli) {
        report(&err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
        context: cli.context,
        account: cli.account,
        region: cli.region,
    };

    match cli.command {
        Command::Synth(args) => commands::synth::run(&ctx, &args),
        Command::Plan(args) => commands::plan::run(&ctx, &args),
        Command::Diff(args) => commands::diff::run(&ctx, &args),
        Command::Doctor => commands::doctor::run(&ctx),
        Command::Init { force } => commands::init::run(&ctx, force),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "tierstack", &mut io::stdout());
            Ok(())
        }
    }
}

/// Print the error chain, plus advice when the root cause is a composition error
fn report(err: &anyhow::Error) {
    ui::error(&format!("{err}"));
    for cause in err.chain().skip(1) {
        ui::cause(&cause.to_string());
    }

    if let Some(topology_err) = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<topology::Error>())
    {
        let category = topology_err.category();
        ui::advice(category.description(), category.advice());
    }
}
