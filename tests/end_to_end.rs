mod support;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use mxdeliver::config;
use mxdeliver::{
    ChannelFeed, DeliveryEngine, EngineConfig, EngineError, EngineState, LookupMx, MxCache,
    MxHost, NotificationRecord, RawEngineConfig, ResolveMx,
};
use support::MockSmtpServer;
use trust_dns_resolver::error::ResolveError;

/// Every domain resolves to the loopback exchanger.
struct LoopbackMx {
    queries: Arc<AtomicUsize>,
}

impl LookupMx for LoopbackMx {
    fn lookup_mx(&self, _domain: &str) -> Result<Vec<MxHost>, ResolveError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(vec![MxHost::new(10, "127.0.0.1")])
    }
}

fn loopback_cache() -> (Arc<MxCache>, Arc<AtomicUsize>) {
    let queries = Arc::new(AtomicUsize::new(0));
    let cache = MxCache::new(LoopbackMx {
        queries: Arc::clone(&queries),
    });
    (Arc::new(cache), queries)
}

fn direct_config(name: &str, to: &[&str], port: u16) -> EngineConfig {
    let mut config = EngineConfig::from_raw(
        RawEngineConfig {
            from: "alerts@example.net".into(),
            to: to.iter().map(|t| t.to_string()).collect(),
            connect_timeout_secs: Some(5),
            command_timeout_secs: Some(5),
            ..RawEngineConfig::default()
        },
        name,
    )
    .expect("valid config");
    config.options.smtp_port = port;
    config
}

#[test]
fn direct_delivery_probes_then_mails_each_record() {
    let server = MockSmtpServer::start(2, &[]);
    let (cache, queries) = loopback_cache();
    let config = direct_config("ops", &["ops@example.com"], server.port);

    let mut engine = DeliveryEngine::connect(config, cache).expect("engine");
    engine.prepare().expect("loopback exchanger accepts the probe");

    let (sender, mut feed) = ChannelFeed::bounded(8);
    let producer = thread::spawn(move || {
        let mut record = sender.acquire();
        record.timestamp_nanos = 1_714_564_800_000_000_000;
        record.severity = 3;
        record.logger.push_str("app");
        record.hostname.push_str("h1");
        record.payload.push_str("disk almost full");
        sender.send(record).expect("engine listening");
    });

    let delivered = engine.run(&mut feed).expect("feed drained");
    producer.join().expect("producer thread");
    assert_eq!(delivered, 1);
    assert_eq!(queries.load(Ordering::SeqCst), 1);

    let transcript = server.finish();
    assert_eq!(
        transcript.commands,
        [
            "EHLO localhost",
            "MAIL FROM:<alerts@example.net>",
            "RCPT TO:<ops@example.com>",
            "RSET",
            "QUIT",
            "EHLO localhost",
            "MAIL FROM:<alerts@example.net>",
            "RCPT TO:<ops@example.com>",
            "DATA",
            "QUIT",
        ]
    );
    assert_eq!(transcript.messages.len(), 1);
    assert_eq!(
        transcript.messages[0],
        "Subject: 2024-05-01T12:00:00Z [3] app@h1: disk almost full\r\n\r\ndisk almost full\r\n"
    );
}

#[test]
fn rejected_recipient_fails_prepare() {
    let server = MockSmtpServer::start(1, &["ghost@example.com"]);
    let (cache, _) = loopback_cache();
    let config = direct_config("ops", &["ops@example.com", "ghost@example.com"], server.port);

    let mut engine = DeliveryEngine::connect(config, cache).expect("engine");
    let err = engine.prepare().expect_err("ghost is unknown");
    assert!(matches!(err, EngineError::Probe { .. }), "{err:?}");
    assert!(err.to_string().contains("example.com"));
    assert_eq!(engine.state(), &EngineState::Uninitialized);

    let transcript = server.finish();
    assert!(
        !transcript.commands.iter().any(|c| c == "DATA"),
        "probe must not send content"
    );
}

#[test]
fn engines_share_one_mx_cache() {
    let server = MockSmtpServer::start(2, &[]);
    let (cache, queries) = loopback_cache();
    let resolver: Arc<dyn ResolveMx> = cache.clone();

    let mut first = DeliveryEngine::connect(
        direct_config("first", &["a@example.com"], server.port),
        Arc::clone(&resolver),
    )
    .expect("engine");
    let mut second = DeliveryEngine::connect(
        direct_config("second", &["b@EXAMPLE.com"], server.port),
        resolver,
    )
    .expect("engine");

    first.prepare().expect("first prepare");
    second.prepare().expect("second prepare");
    server.finish();

    assert_eq!(queries.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
    assert!(cache.cached("example.com").is_some());
}

#[test]
fn relay_from_config_file_receives_all_recipients() {
    let server = MockSmtpServer::start(2, &[]);
    let text = format!(
        r#"
        [[engine]]
        name = "relay"
        address = "127.0.0.1:{port}"
        from = "alerts@example.net"
        to = ["a@example.com", "b@other.org"]
        command_timeout_secs = 5
        "#,
        port = server.port
    );
    let mut configs = config::parse_str(&text, Path::new("inline.toml")).expect("config parses");
    let config = configs.pop().expect("one engine");
    assert!(!config.mode.is_direct());

    let (cache, queries) = loopback_cache();
    let mut engine = DeliveryEngine::connect(config, cache).expect("engine");
    engine.prepare().expect("relay accepts");
    engine
        .send(b"Subject: relayed\r\n\r\nhello")
        .expect("relay delivery");
    assert_eq!(queries.load(Ordering::SeqCst), 0);

    let transcript = server.finish();
    let rcpts: Vec<&str> = transcript
        .commands
        .iter()
        .filter(|c| c.starts_with("RCPT TO:"))
        .map(String::as_str)
        .collect();
    assert_eq!(
        rcpts,
        [
            "RCPT TO:<a@example.com>",
            "RCPT TO:<b@other.org>",
            "RCPT TO:<a@example.com>",
            "RCPT TO:<b@other.org>",
        ]
    );
    assert_eq!(transcript.messages, ["Subject: relayed\r\n\r\nhello\r\n"]);
}

#[test]
fn unreachable_exchanger_stops_engine_on_send() {
    let server = MockSmtpServer::start(1, &[]);
    let (cache, _) = loopback_cache();
    let mut config = direct_config("ops", &["ops@example.com"], server.port);
    config.options.connect_timeout = Duration::from_secs(1);

    let mut engine = DeliveryEngine::connect(config, cache).expect("engine");
    engine.prepare().expect("probe succeeds");
    // Only one session was served; the listener is gone for the transmit.
    server.finish();

    let mut record = NotificationRecord::default();
    record.payload.push_str("lost");
    let err = engine
        .send(&mxdeliver::format_message(&record))
        .expect_err("nothing listening");
    assert!(err.is_send_failure());
    assert_eq!(engine.state(), &EngineState::Failed);
}
