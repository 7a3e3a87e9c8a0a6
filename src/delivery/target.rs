use std::fmt;

use serde::Serialize;

use crate::smtp::Credentials;

/// A concrete SMTP server to talk to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostTarget {
    pub host: String,
    pub port: u16,
    #[serde(skip)]
    pub credentials: Option<Credentials>,
}

impl HostTarget {
    pub fn new(host: impl Into<String>, port: u16, credentials: Option<Credentials>) -> Self {
        Self {
            host: host.into(),
            port,
            credentials,
        }
    }

    /// A mail exchanger: never authenticated.
    pub fn exchanger(host: impl Into<String>, port: u16) -> Self {
        Self::new(host, port, None)
    }
}

impl fmt::Display for HostTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Envelope of one SMTP transaction.
#[derive(Debug, Clone, Copy)]
pub struct Envelope<'a> {
    pub sender: &'a str,
    pub recipients: &'a [String],
}

impl<'a> Envelope<'a> {
    pub fn new(sender: &'a str, recipients: &'a [String]) -> Self {
        Self { sender, recipients }
    }
}
