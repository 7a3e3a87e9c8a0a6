use std::time::Duration;

use serde::Deserialize;

use crate::delivery::{DeliveryOptions, HostTarget};
use crate::router::split_address;
use crate::smtp::Credentials;

use super::ConfigError;
use super::address::parse_host_port;

/// Port used for relays configured without an explicit one and for every
/// discovered mail exchanger.
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// One `[[engine]]` table exactly as written in the configuration file.
///
/// Nothing is checked here; [`EngineConfig::from_raw`] turns it into a
/// validated configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawEngineConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// `host[:port]` of a fixed relay; empty selects direct-to-MX delivery.
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub helo: Option<String>,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Every message goes through one fixed server.
    Relay(HostTarget),
    /// Each recipient domain is delivered to its own mail exchangers.
    Direct,
}

impl DeliveryMode {
    pub fn is_direct(&self) -> bool {
        matches!(self, Self::Direct)
    }
}

/// Validated configuration of a single delivery engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub name: String,
    pub mode: DeliveryMode,
    pub sender: String,
    pub recipients: Vec<String>,
    pub options: DeliveryOptions,
}

impl EngineConfig {
    /// Validate `raw`. `fallback_name` is used when the table has no `name`.
    pub fn from_raw(raw: RawEngineConfig, fallback_name: &str) -> Result<Self, ConfigError> {
        let sender = raw.from.trim().to_string();
        if sender.is_empty() {
            return Err(ConfigError::MissingSetting("from"));
        }
        split_address(&sender)?;

        if raw.to.is_empty() {
            return Err(ConfigError::MissingSetting("to"));
        }
        let recipients: Vec<String> = raw.to.iter().map(|to| to.trim().to_string()).collect();
        for recipient in &recipients {
            split_address(recipient)?;
        }

        if raw.username.is_empty() && !raw.password.is_empty() {
            return Err(ConfigError::PasswordWithoutUsername);
        }

        let address = raw.address.trim();
        let mode = if address.is_empty() {
            if !raw.username.is_empty() {
                return Err(ConfigError::CredentialsWithoutRelay);
            }
            DeliveryMode::Direct
        } else {
            let (host, port) = parse_host_port(address, DEFAULT_SMTP_PORT)?;
            let credentials = (!raw.username.is_empty())
                .then(|| Credentials::new(raw.username.clone(), raw.password.clone(), &host));
            DeliveryMode::Relay(HostTarget::new(host, port, credentials))
        };

        let mut options = DeliveryOptions::default();
        if let Some(helo) = raw.helo.filter(|helo| !helo.trim().is_empty()) {
            options.helo_domain = helo.trim().to_string();
        }
        if let Some(secs) = raw.connect_timeout_secs {
            options.connect_timeout = positive_secs(secs, "connect_timeout_secs")?;
        }
        if let Some(secs) = raw.command_timeout_secs {
            options.command_timeout = positive_secs(secs, "command_timeout_secs")?;
        }

        let name = raw
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| fallback_name.to_string());

        Ok(Self {
            name,
            mode,
            sender,
            recipients,
            options,
        })
    }
}

fn positive_secs(secs: u64, setting: &'static str) -> Result<Duration, ConfigError> {
    if secs == 0 {
        Err(ConfigError::ZeroTimeout(setting))
    } else {
        Ok(Duration::from_secs(secs))
    }
}
