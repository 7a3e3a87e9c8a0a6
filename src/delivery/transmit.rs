use tracing::debug;

use crate::smtp::SmtpError;

use super::session::open_session;
use super::{Envelope, HostTarget, SmtpConnector};

/// Deliver `body` to `target` in a fresh session that is closed afterwards.
pub fn transmit(
    connector: &SmtpConnector,
    target: &HostTarget,
    envelope: &Envelope<'_>,
    body: &[u8],
) -> Result<(), SmtpError> {
    let mut client = open_session(connector, target)?;
    client.mail_from(envelope.sender)?;
    for recipient in envelope.recipients {
        client.rcpt_to(recipient)?;
    }
    client.data(body)?;
    client.quit();
    debug!(server = %target, recipients = envelope.recipients.len(), bytes = body.len(), "message accepted");
    Ok(())
}
