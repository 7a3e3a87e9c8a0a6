use tracing::debug;

use crate::smtp::SmtpError;

use super::session::open_session;
use super::{Envelope, HostTarget, SmtpConnector};

/// Check that `target` would accept mail for every recipient of `envelope`
/// without sending any content: the transaction is reset after the last
/// `RCPT TO` and the session closed.
pub fn probe(
    connector: &SmtpConnector,
    target: &HostTarget,
    envelope: &Envelope<'_>,
) -> Result<(), SmtpError> {
    let mut client = open_session(connector, target)?;
    client.mail_from(envelope.sender)?;
    for recipient in envelope.recipients {
        client.rcpt_to(recipient)?;
    }
    client.reset()?;
    client.quit();
    debug!(server = %target, recipients = envelope.recipients.len(), "probe accepted");
    Ok(())
}
