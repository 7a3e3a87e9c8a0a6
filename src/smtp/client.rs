use std::time::Duration;

#[cfg(feature = "with-starttls")]
use native_tls::TlsConnector;
use tracing::trace;

use super::stream::SmtpStream;
use super::{Credentials, SmtpError, SmtpReply};

/// One blocking SMTP client session.
///
/// Methods map one-to-one onto protocol steps and fail on the first
/// unexpected reply, so a caller can stop wherever its dialogue ends (a probe
/// stops at `RSET`, a transmission continues through `DATA`).
#[derive(Debug)]
pub struct SmtpClient {
    host: String,
    stream: SmtpStream,
    ehlo: Option<SmtpReply>,
}

impl SmtpClient {
    /// Connect to `host:port` and consume the server greeting.
    pub fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Result<Self, SmtpError> {
        let stream = SmtpStream::connect(host, port, connect_timeout, command_timeout)?;
        let mut client = Self {
            host: host.to_string(),
            stream,
            ehlo: None,
        };
        let greeting = client.read_reply()?;
        if !greeting.is_positive_completion() {
            return Err(client.protocol_error("<greeting>", &greeting));
        }
        Ok(client)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn is_encrypted(&self) -> bool {
        self.stream.is_tls()
    }

    /// `EHLO`, falling back to `HELO` on any other reply than success.
    pub fn hello(&mut self, identity: &str) -> Result<(), SmtpError> {
        let reply = self.command(&format!("EHLO {identity}"))?;
        if reply.is_positive_completion() {
            self.ehlo = Some(reply);
            return Ok(());
        }

        self.ehlo = None;
        let helo_cmd = format!("HELO {identity}");
        let reply = self.command(&helo_cmd)?;
        if reply.is_positive_completion() {
            Ok(())
        } else {
            Err(self.protocol_error(&helo_cmd, &reply))
        }
    }

    /// Whether the last `EHLO` advertised `extension`. Always false after a
    /// `HELO` fallback.
    pub fn supports(&self, extension: &str) -> bool {
        self.ehlo
            .as_ref()
            .is_some_and(|reply| reply.has_capability(extension))
    }

    /// Upgrade to TLS and greet again, as the session state resets.
    #[cfg(feature = "with-starttls")]
    pub fn starttls(&mut self, connector: &TlsConnector, identity: &str) -> Result<(), SmtpError> {
        self.expect("STARTTLS", |reply| reply.is_positive_completion())?;
        self.stream.upgrade_tls(connector)?;
        self.ehlo = None;
        trace!(host = %self.host, "TLS established");
        self.hello(identity)
    }

    pub fn authenticate(&mut self, credentials: &Credentials) -> Result<(), SmtpError> {
        let mechanisms = self
            .ehlo
            .as_ref()
            .and_then(|reply| reply.capability_params("AUTH"))
            .ok_or_else(|| SmtpError::auth(&self.host, "server does not advertise AUTH"))?;
        if !mechanisms.iter().any(|m| m.eq_ignore_ascii_case("PLAIN")) {
            return Err(SmtpError::auth(
                &self.host,
                format!("PLAIN not offered (server offers: {})", mechanisms.join(" ")),
            ));
        }
        credentials
            .check_server(&self.host, self.is_encrypted())
            .map_err(|reason| SmtpError::auth(&self.host, reason))?;

        let line = format!("AUTH PLAIN {}", credentials.plain_initial_response());
        trace!(host = %self.host, "C: AUTH PLAIN <redacted>");
        self.stream.send_line(&line)?;
        let reply = self.read_reply()?;
        if reply.code == 235 {
            Ok(())
        } else {
            Err(SmtpError::auth(&self.host, format!("server replied {reply}")))
        }
    }

    pub fn mail_from(&mut self, sender: &str) -> Result<(), SmtpError> {
        self.expect(&format!("MAIL FROM:<{sender}>"), |reply| {
            reply.is_positive_completion()
        })
        .map(drop)
    }

    pub fn rcpt_to(&mut self, recipient: &str) -> Result<(), SmtpError> {
        let reply = self.command(&format!("RCPT TO:<{recipient}>"))?;
        if reply.is_positive_completion() {
            Ok(())
        } else {
            Err(SmtpError::RecipientRejected {
                host: self.host.clone(),
                recipient: recipient.to_string(),
                code: reply.code,
                message: reply.message(),
            })
        }
    }

    /// Send `body` as message content. Line endings are normalized to CRLF
    /// and lines starting with a dot are escaped.
    pub fn data(&mut self, body: &[u8]) -> Result<(), SmtpError> {
        self.expect("DATA", |reply| reply.is_positive_intermediate())?;
        trace!(host = %self.host, bytes = body.len(), "C: <message content>");
        self.stream.write_all(&encode_data(body))?;
        let reply = self.read_reply()?;
        if reply.is_positive_completion() {
            Ok(())
        } else {
            Err(self.protocol_error("<end of data>", &reply))
        }
    }

    pub fn reset(&mut self) -> Result<(), SmtpError> {
        self.expect("RSET", |reply| reply.is_positive_completion())
            .map(drop)
    }

    /// Close the session. The reply is read when possible but never required;
    /// some servers drop the connection right after `QUIT`.
    pub fn quit(mut self) {
        if self.stream.send_line("QUIT").is_ok() {
            trace!(host = %self.host, "C: QUIT");
            if let Ok(reply) = self.stream.read_reply() {
                trace!(host = %self.host, "S: {reply}");
            }
        }
    }

    fn expect(
        &mut self,
        command: &str,
        accept: impl Fn(&SmtpReply) -> bool,
    ) -> Result<SmtpReply, SmtpError> {
        let reply = self.command(command)?;
        if accept(&reply) {
            Ok(reply)
        } else {
            Err(self.protocol_error(command, &reply))
        }
    }

    fn command(&mut self, command: &str) -> Result<SmtpReply, SmtpError> {
        trace!(host = %self.host, "C: {command}");
        self.stream.send_line(command)?;
        self.read_reply()
    }

    fn read_reply(&mut self) -> Result<SmtpReply, SmtpError> {
        let reply = self.stream.read_reply()?;
        trace!(host = %self.host, "S: {reply}");
        Ok(reply)
    }

    fn protocol_error(&self, command: &str, reply: &SmtpReply) -> SmtpError {
        SmtpError::Protocol {
            host: self.host.clone(),
            command: command.to_string(),
            code: reply.code,
            message: reply.message(),
        }
    }
}

/// Encode message content for the `DATA` phase, terminator included.
pub(crate) fn encode_data(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + body.len() / 32 + 5);
    let mut lines = body.split(|byte| *byte == b'\n').peekable();
    while let Some(line) = lines.next() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if lines.peek().is_none() && line.is_empty() {
            break;
        }
        if line.first() == Some(&b'.') {
            out.push(b'.');
        }
        out.extend_from_slice(line);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b".\r\n");
    out
}
