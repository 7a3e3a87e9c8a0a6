use chrono::{DateTime, SecondsFormat, Utc};

use super::NotificationRecord;

/// Number of payload bytes repeated in the subject line.
pub const SUBJECT_PAYLOAD_LIMIT: usize = 100;

/// Render `record` as a message:
/// `Subject: <time> [<severity>] <logger>@<hostname>: <payload head>`, a blank
/// line, then the whole payload.
///
/// The subject carries at most [`SUBJECT_PAYLOAD_LIMIT`] bytes of payload,
/// cut on the byte count even inside a multi-byte character.
pub fn format_message(record: &NotificationRecord) -> Vec<u8> {
    let payload = record.payload.as_bytes();
    let head = &payload[..payload.len().min(SUBJECT_PAYLOAD_LIMIT)];
    let prefix = format!(
        "Subject: {} [{}] {}@{}: ",
        rfc3339(record.timestamp_nanos),
        record.severity,
        record.logger,
        record.hostname
    );

    let mut body = Vec::with_capacity(prefix.len() + head.len() + 4 + payload.len());
    body.extend_from_slice(prefix.as_bytes());
    body.extend_from_slice(head);
    body.extend_from_slice(b"\r\n\r\n");
    body.extend_from_slice(payload);
    body
}

/// RFC 3339 rendering (UTC, whole seconds) of nanoseconds since the epoch.
pub fn rfc3339(timestamp_nanos: i64) -> String {
    let secs = timestamp_nanos.div_euclid(1_000_000_000);
    let nanos = timestamp_nanos.rem_euclid(1_000_000_000) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}
