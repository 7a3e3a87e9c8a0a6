use std::time::Duration;

use crate::config::DEFAULT_SMTP_PORT;

/// Session settings shared by probes and transmissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOptions {
    /// Identity sent with `EHLO`/`HELO`.
    pub helo_domain: String,
    pub connect_timeout: Duration,
    /// Read/write deadline for every command once connected.
    pub command_timeout: Duration,
    /// Port used for discovered mail exchangers.
    pub smtp_port: u16,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            helo_domain: "localhost".to_string(),
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(30),
            smtp_port: DEFAULT_SMTP_PORT,
        }
    }
}
