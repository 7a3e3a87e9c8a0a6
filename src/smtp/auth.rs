use std::fmt;
use std::net::IpAddr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// `AUTH PLAIN` credentials, bound to the server they were configured for.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
    host: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>, host: &str) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            host: host.to_string(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Server identity the credentials may be presented to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Refuse to hand the password to a different server, or over plaintext
    /// to anything but the local machine.
    pub(crate) fn check_server(&self, server: &str, encrypted: bool) -> Result<(), String> {
        if !server.eq_ignore_ascii_case(&self.host) {
            return Err(format!(
                "credentials are bound to {}, not {server}",
                self.host
            ));
        }
        if !encrypted && !is_localhost(server) {
            return Err("refusing PLAIN authentication over an unencrypted connection".into());
        }
        Ok(())
    }

    /// Base64 of `\0username\0password` (RFC 4616, empty authorization identity).
    pub(crate) fn plain_initial_response(&self) -> String {
        let mut raw = Vec::with_capacity(self.username.len() + self.password.len() + 2);
        raw.push(0);
        raw.extend_from_slice(self.username.as_bytes());
        raw.push(0);
        raw.extend_from_slice(self.password.as_bytes());
        STANDARD.encode(raw)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .finish()
    }
}

fn is_localhost(host: &str) -> bool {
    host.eq_ignore_ascii_case("localhost")
        || host
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false)
}
