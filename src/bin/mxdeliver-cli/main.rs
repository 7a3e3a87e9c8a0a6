use anyhow::{Context, Result, bail};
use clap::Parser;
use mxdeliver::{MxCache, ResolveMx};
use tracing::{error, info};

mod args;
mod logging;
mod output;
mod run;

use args::{Cli, Commands};
use output::{MxRow, ProbeRow};

// exit codes: 0 OK, 1 fatal, 2 an engine stopped on a failed delivery
fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_format);

    match cli.cmd {
        Commands::Run {
            config,
            engines,
            input,
            queue,
        } => {
            let configs = run::load_engines(&config, &engines)?;
            info!(config = %config.display(), engines = configs.len(), "preparing delivery engines");
            let prepared = run::prepare_engines(configs)?;

            let mut ready = Vec::with_capacity(prepared.len());
            let mut failed = 0;
            for (engine, outcome) in prepared {
                match outcome {
                    Ok(()) => ready.push(engine),
                    Err(err) => {
                        error!(engine = %engine.name(), error = %err, "engine failed to prepare");
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} engine(s) failed to prepare");
            }

            let outcomes = run::run_engines(ready, input.as_deref(), queue)?;
            let mut stopped = false;
            for outcome in &outcomes {
                match &outcome.result {
                    Ok(delivered) => info!(engine = %outcome.engine, delivered, "engine finished"),
                    Err(err) => {
                        error!(engine = %outcome.engine, error = %err, "engine stopped");
                        stopped = true;
                    }
                }
            }
            if stopped {
                std::process::exit(2);
            }
        }
        Commands::Probe {
            config,
            engines,
            format,
        } => {
            let configs = run::load_engines(&config, &engines)?;
            let prepared = run::prepare_engines(configs)?;
            let rows: Vec<ProbeRow> = prepared
                .iter()
                .map(|(engine, outcome)| ProbeRow::new(engine, outcome))
                .collect();
            output::print_probe(&rows, format)?;
            if rows.iter().any(|row| !row.ok()) {
                std::process::exit(1);
            }
        }
        Commands::Mx { domains, format } => {
            let cache = MxCache::from_system_conf().context("initializing DNS resolver")?;
            let rows: Vec<MxRow> = domains
                .into_iter()
                .map(|domain| match cache.resolve(&domain) {
                    Ok(hosts) => MxRow {
                        domain,
                        hosts: Some(hosts.to_vec()),
                        error: None,
                    },
                    Err(err) => MxRow {
                        domain,
                        hosts: None,
                        error: Some(err.to_string()),
                    },
                })
                .collect();
            output::print_mx(&rows, format)?;
            if rows.iter().any(|row| row.error.is_some()) {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
