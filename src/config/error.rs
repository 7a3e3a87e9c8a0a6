use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed address '{address}': {reason}")]
    MalformedAddress {
        address: String,
        reason: &'static str,
    },
    #[error("missing required setting '{0}'")]
    MissingSetting(&'static str),
    #[error("invalid relay address '{address}': {reason}")]
    InvalidRelay { address: String, reason: String },
    #[error("'username'/'password' require a relay 'address' (direct MX delivery cannot authenticate)")]
    CredentialsWithoutRelay,
    #[error("'password' is set without 'username'")]
    PasswordWithoutUsername,
    #[error("'{0}' must be greater than zero")]
    ZeroTimeout(&'static str),
    #[error("duplicate engine name '{0}'")]
    DuplicateName(String),
    #[error("configuration {path} defines no [[engine]] table")]
    NoEngines { path: PathBuf },
    #[error("cannot read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub(crate) fn malformed(address: impl Into<String>, reason: &'static str) -> Self {
        Self::MalformedAddress {
            address: address.into(),
            reason,
        }
    }

    pub(crate) fn invalid_relay(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRelay {
            address: address.into(),
            reason: reason.into(),
        }
    }
}
