use anyhow::Result;
use mxdeliver::{DeliveryMode, EngineError, MxHost, RoutingTable};
use serde::Serialize;

use crate::args::OutputFormat;
use crate::run::Engine;

#[derive(Debug, Serialize)]
pub struct ProbeRow {
    pub engine: String,
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routes: Option<RoutingTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeRow {
    pub fn new(engine: &Engine, outcome: &Result<(), EngineError>) -> Self {
        let mode = match engine.config().mode {
            DeliveryMode::Relay(_) => "relay",
            DeliveryMode::Direct => "direct",
        };
        Self {
            engine: engine.name().to_string(),
            mode,
            routes: engine.routing_table().cloned(),
            error: outcome.as_ref().err().map(ToString::to_string),
        }
    }

    pub fn ok(&self) -> bool {
        self.error.is_none()
    }

    fn human_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match &self.error {
            Some(error) => lines.push(format!("[FAILED] {} ({}) :: {error}", self.engine, self.mode)),
            None => lines.push(format!("[READY]  {} ({})", self.engine, self.mode)),
        }
        for route in self.routes.iter().flat_map(RoutingTable::routes) {
            let hosts = route
                .hosts
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!(
                "         {} -> {hosts} [{}]",
                route.key,
                route.recipients.join(", ")
            ));
        }
        lines
    }
}

#[derive(Debug, Serialize)]
pub struct MxRow {
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosts: Option<Vec<MxHost>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MxRow {
    fn human_summary(&self) -> String {
        if let Some(error) = &self.error {
            return format!("{}: error: {error}", self.domain);
        }
        let hosts = self
            .hosts
            .iter()
            .flatten()
            .map(|h| format!("{}:{}", h.preference, h.exchange))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}: {hosts}", self.domain)
    }
}

pub fn print_probe(rows: &[ProbeRow], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => {
            for row in rows {
                for line in row.human_lines() {
                    println!("{line}");
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
    }
    Ok(())
}

pub fn print_mx(rows: &[MxRow], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => {
            for row in rows {
                println!("{}", row.human_summary());
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
    }
    Ok(())
}
