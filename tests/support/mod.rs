//! Loopback SMTP server for end-to-end tests.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

/// What the mock server saw across all sessions.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    pub commands: Vec<String>,
    pub messages: Vec<String>,
}

pub struct MockSmtpServer {
    pub port: u16,
    transcript: Arc<Mutex<Transcript>>,
    handle: thread::JoinHandle<()>,
}

impl MockSmtpServer {
    /// Serve `sessions` sequential connections, rejecting `RCPT TO` for any
    /// address in `unknown`.
    pub fn start(sessions: usize, unknown: &[&str]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let port = listener.local_addr().expect("addr").port();
        let transcript = Arc::new(Mutex::new(Transcript::default()));
        let unknown: Vec<String> = unknown.iter().map(|u| format!("RCPT TO:<{u}>")).collect();

        let shared = Arc::clone(&transcript);
        let handle = thread::spawn(move || {
            for _ in 0..sessions {
                let Ok((stream, _)) = listener.accept() else {
                    return;
                };
                let _ = serve(stream, &unknown, &shared);
            }
        });
        Self {
            port,
            transcript,
            handle,
        }
    }

    /// Wait for every session to end and return the transcript.
    pub fn finish(self) -> Transcript {
        self.handle.join().expect("mock server thread");
        self.transcript.lock().expect("transcript lock").clone()
    }
}

fn serve(mut stream: TcpStream, unknown: &[String], transcript: &Mutex<Transcript>) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    stream.write_all(b"220 mock.smtp.test ESMTP\r\n")?;
    let mut message: Option<String> = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();

        if let Some(body) = message.as_mut() {
            if line == "." {
                let body = message.take().unwrap_or_default();
                transcript.lock().expect("transcript lock").messages.push(body);
                stream.write_all(b"250 2.0.0 Queued\r\n")?;
            } else {
                let unstuffed = line.strip_prefix('.').unwrap_or(&line);
                body.push_str(unstuffed);
                body.push_str("\r\n");
            }
            continue;
        }

        transcript.lock().expect("transcript lock").commands.push(line.clone());
        let reply: &[u8] = match line.as_str() {
            l if l.starts_with("EHLO") => b"250-mock.smtp.test\r\n250 8BITMIME\r\n",
            l if unknown.iter().any(|u| u == l) => b"550 5.1.1 User unknown\r\n",
            "DATA" => {
                message = Some(String::new());
                b"354 End data with <CR><LF>.<CR><LF>\r\n"
            }
            "QUIT" => {
                stream.write_all(b"221 2.0.0 Bye\r\n")?;
                return Ok(());
            }
            _ => b"250 2.0.0 Ok\r\n",
        };
        stream.write_all(reply)?;
    }
}
