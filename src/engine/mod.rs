//! The delivery engine.
//!
//! [`DeliveryEngine::prepare`] validates every configured destination once:
//! in direct mode each recipient domain is resolved and its exchangers probed
//! in preference order until one accepts; in relay mode the relay is probed
//! once for all recipients. Only a fully validated engine becomes ready.
//! [`DeliveryEngine::run`] then mails every record of a [`NotificationFeed`],
//! stopping for good at the first delivery failure.

mod error;
mod feed;
mod format;
mod routing;

pub use error::EngineError;
pub use feed::{ChannelFeed, FeedSender, JsonLinesFeed, NotificationFeed, NotificationRecord};
pub use format::{SUBJECT_PAYLOAD_LIMIT, format_message, rfc3339};
pub use routing::{Route, RouteKey, RoutingTable};

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::{DeliveryMode, EngineConfig};
use crate::delivery::{Envelope, HostTarget, SmtpConnector, SmtpTransport};
use crate::mx::ResolveMx;
use crate::router::{RecipientGroup, route_recipients};
use crate::smtp::SmtpError;

/// Lifecycle of a [`DeliveryEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Ready(RoutingTable),
    /// A send failed; the engine accepts no further work.
    Failed,
}

impl EngineState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready(_) => "ready",
            Self::Failed => "failed",
        }
    }
}

pub struct DeliveryEngine<T> {
    config: EngineConfig,
    resolver: Arc<dyn ResolveMx>,
    transport: T,
    state: EngineState,
}

impl DeliveryEngine<SmtpConnector> {
    /// Engine talking to real servers with the session options of `config`.
    pub fn connect(config: EngineConfig, resolver: Arc<dyn ResolveMx>) -> Result<Self, EngineError> {
        let transport = SmtpConnector::new(config.options.clone()).map_err(EngineError::Transport)?;
        Ok(Self::new(config, resolver, transport))
    }
}

impl<T: SmtpTransport> DeliveryEngine<T> {
    pub fn new(config: EngineConfig, resolver: Arc<dyn ResolveMx>, transport: T) -> Self {
        Self {
            config,
            resolver,
            transport,
            state: EngineState::Uninitialized,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn routing_table(&self) -> Option<&RoutingTable> {
        match &self.state {
            EngineState::Ready(table) => Some(table),
            _ => None,
        }
    }

    /// Build and validate the routing table.
    ///
    /// Any domain (or the relay) that cannot be validated fails the whole
    /// call and leaves the engine unprepared. Re-running replaces the table.
    pub fn prepare(&mut self) -> Result<(), EngineError> {
        if self.state == EngineState::Failed {
            return Err(EngineError::Failed);
        }
        self.state = EngineState::Uninitialized;

        let table = match &self.config.mode {
            DeliveryMode::Relay(relay) => self.prepare_relay(relay)?,
            DeliveryMode::Direct => self.prepare_direct()?,
        };
        info!(engine = %self.config.name, routes = table.len(), "delivery engine ready");
        self.state = EngineState::Ready(table);
        Ok(())
    }

    fn prepare_relay(&self, relay: &HostTarget) -> Result<RoutingTable, EngineError> {
        let envelope = Envelope::new(&self.config.sender, &self.config.recipients);
        info!(engine = %self.config.name, relay = %relay, recipients = ?self.config.recipients, "probing relay");
        self.transport
            .probe(relay, &envelope)
            .map_err(|source| EngineError::Probe {
                route: RouteKey::Relay,
                tried: relay.to_string(),
                source,
            })?;

        Ok(RoutingTable::new(vec![Route {
            key: RouteKey::Relay,
            recipients: self.config.recipients.clone(),
            hosts: vec![relay.clone()],
        }]))
    }

    fn prepare_direct(&self) -> Result<RoutingTable, EngineError> {
        let groups = route_recipients(&self.config.recipients)?;
        let mut routes = Vec::with_capacity(groups.len());
        for group in groups {
            let exchangers =
                self.resolver
                    .resolve(&group.domain)
                    .map_err(|source| EngineError::Resolve {
                        domain: group.domain.clone(),
                        source,
                    })?;
            let hosts: Vec<HostTarget> = exchangers
                .iter()
                .map(|mx| HostTarget::exchanger(mx.exchange.clone(), self.config.options.smtp_port))
                .collect();
            self.probe_domain(&group, &hosts)?;

            routes.push(Route {
                key: RouteKey::Domain(group.domain),
                recipients: group.addresses,
                hosts,
            });
        }
        Ok(RoutingTable::new(routes))
    }

    fn probe_domain(&self, group: &RecipientGroup, hosts: &[HostTarget]) -> Result<(), EngineError> {
        let envelope = Envelope::new(&self.config.sender, &group.addresses);
        let mut last_err = None;
        for host in hosts {
            info!(engine = %self.config.name, host = %host, domain = %group.domain, "probing mail exchanger");
            match self.transport.probe(host, &envelope) {
                Ok(()) => {
                    info!(engine = %self.config.name, host = %host, domain = %group.domain, "mail exchanger accepted probe");
                    return Ok(());
                }
                Err(err) => {
                    warn!(engine = %self.config.name, host = %host, domain = %group.domain, error = %err, "probe failed");
                    last_err = Some(err);
                }
            }
        }

        let tried = hosts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Err(EngineError::Probe {
            route: RouteKey::Domain(group.domain.clone()),
            tried,
            source: last_err.unwrap_or_else(|| SmtpError::Connect {
                host: group.domain.clone(),
                port: self.config.options.smtp_port,
                source: std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    "no mail exchanger",
                ),
            }),
        })
    }

    /// Deliver one formatted message along every route.
    ///
    /// Routes are walked in table order and each route's hosts in fallback
    /// order. The first route whose hosts all fail aborts the call: later
    /// routes are not attempted, earlier deliveries stand, and the engine
    /// moves to [`EngineState::Failed`].
    pub fn send(&mut self, body: &[u8]) -> Result<(), EngineError> {
        let result = match &self.state {
            EngineState::Ready(table) => {
                deliver(&self.transport, &self.config.sender, table, body)
            }
            EngineState::Uninitialized => return Err(EngineError::NotReady),
            EngineState::Failed => return Err(EngineError::Failed),
        };
        if let Err(err) = &result {
            error!(engine = %self.config.name, error = %err, "delivery failed, stopping engine");
            self.state = EngineState::Failed;
        }
        result
    }

    /// Mail every record of `feed` until it closes; returns how many were
    /// delivered. The first failed send ends the loop with that error.
    pub fn run<F>(&mut self, feed: &mut F) -> Result<u64, EngineError>
    where
        F: NotificationFeed + ?Sized,
    {
        match self.state {
            EngineState::Ready(_) => {}
            EngineState::Uninitialized => return Err(EngineError::NotReady),
            EngineState::Failed => return Err(EngineError::Failed),
        }

        let mut delivered = 0;
        while let Some(record) = feed.recv() {
            let body = format_message(&record);
            feed.recycle(record);
            self.send(&body)?;
            delivered += 1;
        }
        info!(engine = %self.config.name, delivered, "notification feed closed");
        Ok(delivered)
    }
}

fn deliver<T: SmtpTransport>(
    transport: &T,
    sender: &str,
    table: &RoutingTable,
    body: &[u8],
) -> Result<(), EngineError> {
    for route in table.routes() {
        deliver_route(transport, sender, route, body)?;
    }
    Ok(())
}

fn deliver_route<T: SmtpTransport>(
    transport: &T,
    sender: &str,
    route: &Route,
    body: &[u8],
) -> Result<(), EngineError> {
    let envelope = Envelope::new(sender, &route.recipients);
    let mut last_failure = None;
    for host in &route.hosts {
        match transport.transmit(host, &envelope, body) {
            Ok(()) => {
                info!(route = %route.key, host = %host, recipients = ?route.recipients, "message delivered");
                return Ok(());
            }
            Err(err) => {
                warn!(route = %route.key, host = %host, error = %err, "send failed");
                last_failure = Some((host, err));
            }
        }
    }

    let (host, source) = last_failure.ok_or_else(|| EngineError::Send {
        route: route.key.clone(),
        host: String::new(),
        source: SmtpError::Connect {
            host: route.key.to_string(),
            port: 0,
            source: std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, "route has no hosts"),
        },
    })?;
    Err(EngineError::Send {
        route: route.key.clone(),
        host: host.to_string(),
        source,
    })
}

impl<T> std::fmt::Debug for DeliveryEngine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryEngine")
            .field("name", &self.config.name)
            .field("state", &self.state.name())
            .finish_non_exhaustive()
    }
}
