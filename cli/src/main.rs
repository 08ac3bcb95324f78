mod commands;
mod terminal;

use anyhow::Context;
use commands::{CommandLine, Commands, audit, inspect};
use swanwatch_common::config::{Config, RunOptions};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.verbose, commands.quiet);
    print::banner(commands.no_banner, commands.quiet);

    let mut cfg = Config::read(&commands.config)
        .with_context(|| format!("loading {}", commands.config.display()))?;

    match commands.command {
        Commands::Audit {
            no_remediate,
            output,
            concurrency,
        } => {
            if let Some(output) = output {
                cfg.output_path = output;
            }
            if concurrency.is_some() {
                cfg.probe.max_concurrency = concurrency;
            }
            cfg.validate()?;

            print::header("auditing tunnels", commands.quiet);
            let options = RunOptions {
                remediate: !no_remediate,
            };
            audit::audit(&cfg, options, commands.quiet).await
        }
        Commands::Inspect => {
            cfg.validate()?;
            print::header("child security associations", commands.quiet);
            inspect::inspect(&cfg, commands.quiet).await
        }
    }
}
