pub mod audit;
pub mod inspect;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "swanwatch")]
#[command(about = "Audits IPsec tunnels and restarts the ones that are down.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the JSON config file
    #[arg(short, long, global = true, default_value = "config.json")]
    pub config: PathBuf,

    /// Print less; repeat to print only the summary
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub quiet: u8,

    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip the banner
    #[arg(long, global = true)]
    pub no_banner: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe every tunnel, write the report and terminate offline tunnels
    #[command(alias = "a")]
    Audit {
        /// Write the report but leave offline tunnels alone
        #[arg(long)]
        no_remediate: bool,
        /// Report path, overriding `output_path` from the config
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Maximum number of probes in flight
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// List the tunnels the firewall reports, without probing them
    #[command(alias = "i")]
    Inspect,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
