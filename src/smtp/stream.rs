use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

#[cfg(feature = "with-starttls")]
use native_tls::{HandshakeError, TlsConnector, TlsStream};

use super::{SmtpError, SmtpReply};

/// Longest reply line accepted before the peer is considered broken.
const MAX_LINE: usize = 8 * 1024;

#[derive(Debug)]
enum StreamState {
    Plain(TcpStream),
    #[cfg(feature = "with-starttls")]
    Tls(Box<TlsStream<TcpStream>>),
    Invalid,
}

/// Line-oriented SMTP transport over plain TCP, upgradable to TLS in place.
#[derive(Debug)]
pub(crate) struct SmtpStream {
    host: String,
    state: StreamState,
    buffer: Vec<u8>,
}

impl SmtpStream {
    /// Connect to the first reachable address of `host:port`.
    pub(crate) fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Result<Self, SmtpError> {
        let connect_err = |source: io::Error| SmtpError::Connect {
            host: host.to_string(),
            port,
            source,
        };

        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(connect_err)?
            .collect();

        let mut last_err = None;
        for addr in &addrs {
            match TcpStream::connect_timeout(addr, connect_timeout) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(command_timeout))
                        .map_err(|err| SmtpError::io(host, err))?;
                    stream
                        .set_write_timeout(Some(command_timeout))
                        .map_err(|err| SmtpError::io(host, err))?;
                    return Ok(Self {
                        host: host.to_string(),
                        state: StreamState::Plain(stream),
                        buffer: Vec::new(),
                    });
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(connect_err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "no socket address available")
        })))
    }

    pub(crate) fn is_tls(&self) -> bool {
        #[cfg(feature = "with-starttls")]
        if matches!(self.state, StreamState::Tls(_)) {
            return true;
        }
        false
    }

    #[cfg(feature = "with-starttls")]
    pub(crate) fn upgrade_tls(&mut self, connector: &TlsConnector) -> Result<(), SmtpError> {
        let plain = match std::mem::replace(&mut self.state, StreamState::Invalid) {
            StreamState::Plain(stream) => stream,
            other => {
                self.state = other;
                return Ok(());
            }
        };
        // Anything buffered before the handshake would be injected plaintext.
        self.buffer.clear();

        let tls = complete_handshake(connector, &self.host, plain)?;
        self.state = StreamState::Tls(Box::new(tls));
        Ok(())
    }

    pub(crate) fn send_line(&mut self, line: &str) -> Result<(), SmtpError> {
        let mut data = Vec::with_capacity(line.len() + 2);
        data.extend_from_slice(line.as_bytes());
        data.extend_from_slice(b"\r\n");
        self.write_all(&data)
    }

    pub(crate) fn write_all(&mut self, data: &[u8]) -> Result<(), SmtpError> {
        let result = match &mut self.state {
            StreamState::Plain(stream) => stream.write_all(data).and_then(|()| stream.flush()),
            #[cfg(feature = "with-starttls")]
            StreamState::Tls(stream) => stream.write_all(data).and_then(|()| stream.flush()),
            StreamState::Invalid => return Err(self.invalid_state()),
        };
        result.map_err(|err| SmtpError::io(&self.host, err))
    }

    pub(crate) fn read_reply(&mut self) -> Result<SmtpReply, SmtpError> {
        let mut lines = Vec::new();
        let mut code: Option<u16> = None;
        loop {
            let line = self.read_line()?;
            if line.len() < 3 || !line.is_char_boundary(3) {
                return Err(SmtpError::malformed(&self.host, format!("short reply '{line}'")));
            }
            let parsed_code = line[..3].parse::<u16>().map_err(|_| {
                SmtpError::malformed(&self.host, format!("invalid code in line '{line}'"))
            })?;
            match code {
                Some(existing) if existing != parsed_code => {
                    return Err(SmtpError::malformed(
                        &self.host,
                        format!("inconsistent reply codes: {existing} vs {parsed_code}"),
                    ));
                }
                Some(_) => {}
                None => code = Some(parsed_code),
            }
            let is_last = line.as_bytes().get(3) != Some(&b'-');
            lines.push(line.get(4..).unwrap_or_default().to_string());
            if is_last {
                break;
            }
        }
        Ok(SmtpReply {
            code: code.unwrap_or_default(),
            lines,
        })
    }

    fn read_line(&mut self) -> Result<String, SmtpError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
                let mut line = self.buffer.drain(..=pos).collect::<Vec<_>>();
                line.pop();
                if line.ends_with(b"\r") {
                    line.pop();
                }
                return String::from_utf8(line)
                    .map_err(|err| SmtpError::malformed(&self.host, format!("utf8 error: {err}")));
            }
            if self.buffer.len() > MAX_LINE {
                return Err(SmtpError::malformed(&self.host, "reply line too long"));
            }

            let mut buf = [0u8; 512];
            let read = match &mut self.state {
                StreamState::Plain(stream) => stream.read(&mut buf),
                #[cfg(feature = "with-starttls")]
                StreamState::Tls(stream) => stream.read(&mut buf),
                StreamState::Invalid => return Err(self.invalid_state()),
            };
            let read = read.map_err(|err| SmtpError::io(&self.host, err))?;
            if read == 0 {
                return Err(SmtpError::io(
                    &self.host,
                    io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed"),
                ));
            }
            self.buffer.extend_from_slice(&buf[..read]);
        }
    }

    fn invalid_state(&self) -> SmtpError {
        SmtpError::io(
            &self.host,
            io::Error::new(io::ErrorKind::NotConnected, "stream lost during TLS upgrade"),
        )
    }
}

#[cfg(feature = "with-starttls")]
fn complete_handshake(
    connector: &TlsConnector,
    host: &str,
    stream: TcpStream,
) -> Result<TlsStream<TcpStream>, SmtpError> {
    let tls_err = |source| SmtpError::Tls {
        host: host.to_string(),
        source,
    };
    match connector.connect(host, stream) {
        Ok(tls) => Ok(tls),
        Err(HandshakeError::Failure(err)) => Err(tls_err(err)),
        // The socket blocks, so this only happens when the read timeout expires.
        Err(HandshakeError::WouldBlock(_)) => Err(SmtpError::io(
            host,
            io::Error::new(io::ErrorKind::TimedOut, "TLS handshake timed out"),
        )),
    }
}
