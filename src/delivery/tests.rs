use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use super::{DeliveryOptions, Envelope, HostTarget, SmtpConnector, SmtpTransport};
use crate::smtp::{Credentials, ErrorKind, SmtpError};

/// Accepts one session and answers every command from `respond`, recording
/// the command lines (message content excluded).
fn spawn_server<F>(respond: F) -> (u16, thread::JoinHandle<Vec<String>>)
where
    F: Fn(&str) -> &'static str + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let port = listener.local_addr().expect("addr").port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        serve(stream, respond).unwrap_or_default()
    });
    (port, handle)
}

fn serve<F>(mut stream: TcpStream, respond: F) -> io::Result<Vec<String>>
where
    F: Fn(&str) -> &'static str,
{
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut commands = Vec::new();
    stream.write_all(b"220 mock ESMTP\r\n")?;
    let mut in_data = false;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        if in_data {
            if line == "." {
                in_data = false;
                stream.write_all(b"250 2.0.0 Queued\r\n")?;
            }
            continue;
        }
        let reply = respond(&line);
        commands.push(line.clone());
        stream.write_all(reply.as_bytes())?;
        if line == "DATA" && reply.starts_with("354") {
            in_data = true;
        }
        if line == "QUIT" {
            break;
        }
    }
    Ok(commands)
}

fn accept_all(line: &str) -> &'static str {
    match line {
        l if l.starts_with("EHLO") => "250-mock\r\n250 AUTH PLAIN\r\n",
        "DATA" => "354 go ahead\r\n",
        "QUIT" => "221 bye\r\n",
        l if l.starts_with("AUTH PLAIN") => "235 ok\r\n",
        _ => "250 ok\r\n",
    }
}

fn connector() -> SmtpConnector {
    SmtpConnector::new(DeliveryOptions {
        connect_timeout: Duration::from_secs(5),
        command_timeout: Duration::from_secs(5),
        ..DeliveryOptions::default()
    })
    .expect("connector")
}

fn recipients(list: &[&str]) -> Vec<String> {
    list.iter().map(|r| r.to_string()).collect()
}

#[test]
fn probe_resets_instead_of_sending_data() {
    let (port, handle) = spawn_server(accept_all);
    let rcpts = recipients(&["a@example.com", "b@example.com"]);
    connector()
        .probe(
            &HostTarget::exchanger("127.0.0.1", port),
            &Envelope::new("alerts@example.net", &rcpts),
        )
        .expect("probe succeeds");

    let commands = handle.join().expect("server thread");
    assert_eq!(
        commands,
        vec![
            "EHLO localhost",
            "MAIL FROM:<alerts@example.net>",
            "RCPT TO:<a@example.com>",
            "RCPT TO:<b@example.com>",
            "RSET",
            "QUIT",
        ]
    );
}

#[test]
fn probe_reports_rejected_recipient() {
    let (port, handle) = spawn_server(|line| {
        if line == "RCPT TO:<ghost@example.com>" {
            "550 5.1.1 no such user\r\n"
        } else {
            accept_all(line)
        }
    });
    let rcpts = recipients(&["ops@example.com", "ghost@example.com"]);
    let err = connector()
        .probe(
            &HostTarget::exchanger("127.0.0.1", port),
            &Envelope::new("alerts@example.net", &rcpts),
        )
        .expect_err("recipient rejected");
    match err {
        SmtpError::RecipientRejected {
            recipient, code, ..
        } => {
            assert_eq!(recipient, "ghost@example.com");
            assert_eq!(code, 550);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    handle.join().expect("server thread");
}

#[test]
fn transmit_authenticates_and_sends_data() {
    let (port, handle) = spawn_server(accept_all);
    let rcpts = recipients(&["team@example.com"]);
    let target = HostTarget::new(
        "127.0.0.1",
        port,
        Some(Credentials::new("user", "pass", "127.0.0.1")),
    );
    connector()
        .transmit(
            &target,
            &Envelope::new("alerts@example.net", &rcpts),
            b"Subject: hello\r\n\r\nbody",
        )
        .expect("transmit succeeds");

    let commands = handle.join().expect("server thread");
    assert_eq!(commands[0], "EHLO localhost");
    assert!(commands[1].starts_with("AUTH PLAIN "));
    assert_eq!(
        &commands[2..],
        &["MAIL FROM:<alerts@example.net>", "RCPT TO:<team@example.com>", "DATA", "QUIT"]
    );
}

#[test]
fn transmit_surfaces_auth_rejection() {
    let (port, handle) = spawn_server(|line| {
        if line.starts_with("AUTH PLAIN") {
            "535 5.7.8 bad credentials\r\n"
        } else {
            accept_all(line)
        }
    });
    let rcpts = recipients(&["team@example.com"]);
    let target = HostTarget::new(
        "127.0.0.1",
        port,
        Some(Credentials::new("user", "wrong", "127.0.0.1")),
    );
    let err = connector()
        .transmit(&target, &Envelope::new("alerts@example.net", &rcpts), b"x")
        .expect_err("auth rejected");
    assert_eq!(err.kind(), ErrorKind::Auth);
    drop(handle);
}

#[test]
fn host_target_display_brackets_ipv6() {
    assert_eq!(HostTarget::exchanger("::1", 25).to_string(), "[::1]:25");
    assert_eq!(
        HostTarget::exchanger("mx.example.com", 25).to_string(),
        "mx.example.com:25"
    );
}

/// Greets with STARTTLS on offer, accepts the upgrade and then never answers
/// the TLS handshake.
#[cfg(feature = "with-starttls")]
fn stall_after_starttls(mut stream: TcpStream) -> Vec<String> {
    let Ok(read_half) = stream.try_clone() else {
        return Vec::new();
    };
    let mut reader = BufReader::new(read_half);
    let mut commands = Vec::new();
    stream.write_all(b"220 mock ESMTP\r\n").ok();
    for reply in [
        &b"250-mock\r\n250-STARTTLS\r\n250 AUTH PLAIN\r\n"[..],
        &b"220 2.0.0 Ready to start TLS\r\n"[..],
    ] {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            return commands;
        }
        commands.push(line.trim_end().to_string());
        stream.write_all(reply).ok();
    }
    let mut sink = [0u8; 1024];
    while matches!(reader.read(&mut sink), Ok(n) if n > 0) {}
    commands
}

#[cfg(feature = "with-starttls")]
#[test]
fn advertised_starttls_is_used_and_a_stalled_upgrade_fails_the_host() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let port = listener.local_addr().expect("addr").port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        stall_after_starttls(stream)
    });

    let connector = SmtpConnector::new(DeliveryOptions {
        connect_timeout: Duration::from_secs(1),
        command_timeout: Duration::from_secs(1),
        ..DeliveryOptions::default()
    })
    .expect("connector");
    let rcpts = recipients(&["ops@example.com"]);
    let err = connector
        .transmit(
            &HostTarget::exchanger("127.0.0.1", port),
            &Envelope::new("alerts@example.net", &rcpts),
            b"Subject: hi\r\n\r\nhi\r\n",
        )
        .expect_err("TLS never completes");
    assert_eq!(err.kind(), ErrorKind::Connection);

    let commands = handle.join().expect("server thread");
    assert_eq!(commands, ["EHLO localhost", "STARTTLS"]);
}
