#![forbid(unsafe_code)]
//! mxdeliver: direct-to-MX delivery of small plain-text notification mails.
//!
//! A [`DeliveryEngine`] validates every configured recipient domain once at
//! setup ([`DeliveryEngine::prepare`]) by running non-destructive SMTP probes
//! against the domain's mail exchangers (or a fixed relay), then turns each
//! [`NotificationRecord`] pulled from a [`NotificationFeed`] into a message and
//! transmits it, falling back across exchangers in preference order.

pub mod config;
pub mod delivery;
pub mod engine;
pub mod mx;
pub mod router;
pub mod smtp;

pub use config::{ConfigError, DeliveryMode, EngineConfig, RawEngineConfig};
pub use delivery::{DeliveryOptions, Envelope, HostTarget, SmtpConnector, SmtpTransport};
pub use engine::{
    ChannelFeed, DeliveryEngine, EngineError, EngineState, FeedSender, JsonLinesFeed,
    NotificationFeed, NotificationRecord, Route, RouteKey, RoutingTable, format_message,
};
pub use mx::{LookupMx, MxCache, MxError, MxHost, ResolveMx};
pub use router::{RecipientGroup, route_recipients};
pub use smtp::{Credentials, ErrorKind as SmtpErrorKind, SmtpError, SmtpReply};
