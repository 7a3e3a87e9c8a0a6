use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result, bail};
use mxdeliver::{
    ChannelFeed, DeliveryEngine, EngineConfig, EngineError, FeedSender, JsonLinesFeed, MxCache,
    NotificationFeed, ResolveMx, SmtpConnector, config,
};
use tracing::{error, info, warn};

pub type Engine = DeliveryEngine<SmtpConnector>;

/// Load the configuration file and keep the engines named in `only` (all when
/// empty).
pub fn load_engines(path: &Path, only: &[String]) -> Result<Vec<EngineConfig>> {
    let configs = config::load_file(path)
        .with_context(|| format!("loading configuration {}", path.display()))?;
    if only.is_empty() {
        return Ok(configs);
    }
    for name in only {
        if !configs.iter().any(|c| &c.name == name) {
            bail!("no engine named '{name}' in {}", path.display());
        }
    }
    Ok(configs
        .into_iter()
        .filter(|c| only.contains(&c.name))
        .collect())
}

/// Build one engine per configuration over a shared MX cache and prepare them
/// all concurrently. Every engine is returned with its own outcome.
pub fn prepare_engines(
    configs: Vec<EngineConfig>,
) -> Result<Vec<(Engine, Result<(), EngineError>)>> {
    let cache: Arc<dyn ResolveMx> =
        Arc::new(MxCache::from_system_conf().context("initializing DNS resolver")?);

    let mut engines = Vec::with_capacity(configs.len());
    for config in configs {
        let name = config.name.clone();
        let engine = DeliveryEngine::connect(config, Arc::clone(&cache))
            .with_context(|| format!("creating engine '{name}'"))?;
        engines.push(engine);
    }

    let outcomes = thread::scope(|scope| {
        let handles: Vec<_> = engines
            .iter_mut()
            .map(|engine| scope.spawn(move || engine.prepare()))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or(Err(EngineError::NotReady)))
            .collect::<Vec<_>>()
    });

    Ok(engines.into_iter().zip(outcomes).collect())
}

/// How each engine ended a `run`.
pub struct RunOutcome {
    pub engine: String,
    pub result: Result<u64, EngineError>,
}

pub fn run_engines(
    mut engines: Vec<Engine>,
    input: Option<&Path>,
    queue: usize,
) -> Result<Vec<RunOutcome>> {
    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let mut source = JsonLinesFeed::new(reader);

    let outcomes = if engines.len() == 1 {
        let engine = &mut engines[0];
        let result = engine.run(&mut source);
        vec![RunOutcome {
            engine: engine.name().to_string(),
            result,
        }]
    } else {
        fan_out(&mut engines, &mut source, queue)
    };

    if source.skipped() > 0 {
        warn!(skipped = source.skipped(), "some input lines were not valid records");
    }
    Ok(outcomes)
}

/// Run every engine on its own thread, each with a private feed receiving a
/// copy of every input record.
fn fan_out<F: NotificationFeed>(
    engines: &mut [Engine],
    source: &mut F,
    queue: usize,
) -> Vec<RunOutcome> {
    thread::scope(|scope| {
        let mut senders: Vec<(String, FeedSender)> = Vec::with_capacity(engines.len());
        let mut handles = Vec::with_capacity(engines.len());
        for engine in engines.iter_mut() {
            let (sender, mut feed) = ChannelFeed::bounded(queue.max(1));
            senders.push((engine.name().to_string(), sender));
            handles.push(scope.spawn(move || RunOutcome {
                engine: engine.name().to_string(),
                result: engine.run(&mut feed),
            }));
        }

        while let Some(record) = source.recv() {
            senders.retain(|(name, sender)| {
                let mut copy = sender.acquire();
                copy.clone_from(&record);
                match sender.send(copy) {
                    Ok(()) => true,
                    Err(_) => {
                        info!(engine = %name, "engine stopped, no longer feeding it");
                        false
                    }
                }
            });
            source.recycle(record);
            if senders.is_empty() {
                error!("every engine has stopped");
                break;
            }
        }
        drop(senders);

        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| RunOutcome {
                    engine: String::from("<panicked>"),
                    result: Err(EngineError::Failed),
                })
            })
            .collect()
    })
}
