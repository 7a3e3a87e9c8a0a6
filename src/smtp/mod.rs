//! Blocking SMTP client.
//!
//! [`SmtpClient`] drives a single session over [`std::net::TcpStream`], with an
//! optional in-place `STARTTLS` upgrade (`with-starttls` feature, on by
//! default) and `AUTH PLAIN`. Protocol transcripts are emitted as `trace`
//! events.

mod auth;
mod client;
mod error;
mod reply;
mod stream;

pub use auth::Credentials;
pub use client::SmtpClient;
pub use error::{ErrorKind, SmtpError};
pub use reply::SmtpReply;
