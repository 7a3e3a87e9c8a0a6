//! Engine configuration.
//!
//! A configuration file holds one or more `[[engine]]` tables:
//!
//! ```toml
//! [[engine]]
//! name = "ops"
//! address = ""                     # empty: deliver straight to each domain's MX
//! from = "alerts@example.net"
//! to = ["ops@example.com", "oncall@example.org"]
//!
//! [[engine]]
//! name = "relay"
//! address = "smtp.example.net:587"
//! username = "alerts"
//! password = "secret"
//! from = "alerts@example.net"
//! to = ["team@example.com"]
//! ```

mod address;
mod error;
mod types;

pub use error::ConfigError;
pub use types::{DEFAULT_SMTP_PORT, DeliveryMode, EngineConfig, RawEngineConfig};

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default, rename = "engine")]
    engines: Vec<RawEngineConfig>,
}

/// Read and validate every engine defined in the TOML file at `path`.
pub fn load_file(path: &Path) -> Result<Vec<EngineConfig>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&text, path)
}

/// Same as [`load_file`] on already loaded text; `path` is only used in errors.
pub fn parse_str(text: &str, path: &Path) -> Result<Vec<EngineConfig>, ConfigError> {
    let file: ConfigFile = toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if file.engines.is_empty() {
        return Err(ConfigError::NoEngines {
            path: path.to_path_buf(),
        });
    }

    let mut seen = HashSet::new();
    let mut configs = Vec::with_capacity(file.engines.len());
    for (index, raw) in file.engines.into_iter().enumerate() {
        let config = EngineConfig::from_raw(raw, &format!("engine-{}", index + 1))?;
        if !seen.insert(config.name.clone()) {
            return Err(ConfigError::DuplicateName(config.name));
        }
        configs.push(config);
    }
    Ok(configs)
}
