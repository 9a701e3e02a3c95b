use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tierstack")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Compose a three-tier web stack (database, containers, TLS) into a deployable template",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Stack configuration file (default: nearest tierstack.toml)
    #[arg(long, global = true, env = "TIERSTACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Lookup context file (default: tierstack.context.json next to the config)
    #[arg(long, global = true)]
    pub context: Option<PathBuf>,

    /// Target account
    #[arg(long, global = true, env = "CDK_DEFAULT_ACCOUNT")]
    pub account: Option<String>,

    /// Target region
    #[arg(long, global = true, env = "CDK_DEFAULT_REGION")]
    pub region: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compose the stack and render its template
    Synth(SynthArgs),

    /// List the declared resources in order
    Plan(PlanArgs),

    /// Compare the composed stack with a previously synthesized template
    Diff(DiffArgs),

    /// Check configuration, deployment target, build files and lookups
    Doctor,

    /// Write a default tierstack.toml
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options shared by every composing command
#[derive(Args, Debug, Clone, Copy)]
pub struct ModeArgs {
    /// Compose for the dev environment (database destroyed with the stack)
    #[arg(long)]
    pub dev: bool,
}

#[derive(Args, Debug)]
pub struct SynthArgs {
    #[command(flatten)]
    pub mode: ModeArgs,

    /// Write the template to a file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Overwrite the output file without asking
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub mode: ModeArgs,

    /// Only show matching resources (e.g., "database", "compute", "service.Service")
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub mode: ModeArgs,

    /// Previously synthesized template
    #[arg(long)]
    pub against: PathBuf,
}
