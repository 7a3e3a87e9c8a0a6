use thiserror::Error;

/// Broad classes of SMTP failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// TCP or TLS establishment failed, timed out, or the link broke.
    Connection,
    /// The server refused our credentials or cannot authenticate us safely.
    Auth,
    /// The server answered with an unexpected or negative reply.
    Protocol,
}

#[derive(Debug, Error)]
pub enum SmtpError {
    #[error("connection to {host}:{port} failed: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error talking to {host}: {source}")]
    Io {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[cfg(feature = "with-starttls")]
    #[error("TLS connector initialization failed: {source}")]
    TlsInit {
        #[source]
        source: native_tls::Error,
    },
    #[cfg(feature = "with-starttls")]
    #[error("TLS handshake with {host} failed: {source}")]
    Tls {
        host: String,
        #[source]
        source: native_tls::Error,
    },
    #[error("authentication with {host} failed: {reason}")]
    Auth { host: String, reason: String },
    #[error("{host} answered '{command}' with {code}: {message}")]
    Protocol {
        host: String,
        command: String,
        code: u16,
        message: String,
    },
    #[error("{host} rejected recipient {recipient} with {code}: {message}")]
    RecipientRejected {
        host: String,
        recipient: String,
        code: u16,
        message: String,
    },
    #[error("malformed reply from {host}: {detail}")]
    MalformedReply { host: String, detail: String },
}

impl SmtpError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connect { .. } | Self::Io { .. } => ErrorKind::Connection,
            #[cfg(feature = "with-starttls")]
            Self::TlsInit { .. } | Self::Tls { .. } => ErrorKind::Connection,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Protocol { .. } | Self::RecipientRejected { .. } | Self::MalformedReply { .. } => {
                ErrorKind::Protocol
            }
        }
    }

    /// SMTP reply code behind the failure, when the server sent one.
    pub fn reply_code(&self) -> Option<u16> {
        match self {
            Self::Protocol { code, .. } | Self::RecipientRejected { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn io(host: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            host: host.into(),
            source,
        }
    }

    pub(crate) fn auth(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Auth {
            host: host.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(host: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedReply {
            host: host.into(),
            detail: detail.into(),
        }
    }
}
