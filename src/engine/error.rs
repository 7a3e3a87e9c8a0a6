use thiserror::Error;

use crate::config::ConfigError;
use crate::mx::MxError;
use crate::smtp::SmtpError;

use super::RouteKey;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot resolve mail exchangers for {domain}: {source}")]
    Resolve {
        domain: String,
        #[source]
        source: MxError,
    },
    #[error("probe for {route} failed on every host ({tried}): {source}")]
    Probe {
        route: RouteKey,
        tried: String,
        #[source]
        source: SmtpError,
    },
    #[error("sending to {route} via {host} failed: {source}")]
    Send {
        route: RouteKey,
        host: String,
        #[source]
        source: SmtpError,
    },
    #[error("cannot create SMTP transport: {0}")]
    Transport(#[source] SmtpError),
    #[error("delivery engine is not prepared")]
    NotReady,
    #[error("delivery engine stopped after a failed send")]
    Failed,
}

impl EngineError {
    /// Whether this error came from sending a message (as opposed to setup).
    pub fn is_send_failure(&self) -> bool {
        matches!(self, Self::Send { .. })
    }
}
