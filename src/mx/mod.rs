//! Mail-exchanger resolution.
//!
//! [`MxCache`] is the entry point: it performs synchronous MX lookups through a
//! [`LookupMx`] implementation (the system resolver by default) and keeps every
//! successful answer for the lifetime of the cache. Delivery engines reach it
//! through the [`ResolveMx`] capability so tests can plug in a fake.

mod cache;
mod error;
mod resolver;
mod types;

pub use cache::{MxCache, ResolveMx};
pub use error::MxError;
pub use resolver::{LookupMx, system_resolver};
pub use types::MxHost;
