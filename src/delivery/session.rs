use tracing::debug;

use crate::smtp::{SmtpClient, SmtpError};

use super::{HostTarget, SmtpConnector};

/// Connect and negotiate up to the point where a transaction can start:
/// greeting, `EHLO`/`HELO`, opportunistic `STARTTLS`, then `AUTH` when the
/// target carries credentials.
pub(crate) fn open_session(
    connector: &SmtpConnector,
    target: &HostTarget,
) -> Result<SmtpClient, SmtpError> {
    let options = connector.options();
    let mut client = SmtpClient::connect(
        &target.host,
        target.port,
        options.connect_timeout,
        options.command_timeout,
    )?;
    client.hello(&options.helo_domain)?;

    #[cfg(feature = "with-starttls")]
    if client.supports("STARTTLS") {
        client.starttls(connector.tls(), &options.helo_domain)?;
        debug!(server = %target, "upgraded session to TLS");
    }

    if let Some(credentials) = &target.credentials {
        client.authenticate(credentials)?;
        debug!(server = %target, user = credentials.username(), "authenticated");
    }
    Ok(client)
}
