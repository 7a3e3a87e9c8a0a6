//! SMTP sessions run on behalf of the delivery engine.
//!
//! [`probe`] validates deliverability without sending content; [`transmit`]
//! performs the real delivery. Both negotiate the same way (greeting,
//! `EHLO`/`HELO`, opportunistic `STARTTLS`, optional `AUTH PLAIN`) and open a
//! new connection for every call. The engine reaches them through the
//! [`SmtpTransport`] trait, implemented by [`SmtpConnector`].

mod options;
mod probe;
mod session;
mod target;
mod transmit;

pub use options::DeliveryOptions;
pub use probe::probe;
pub use target::{Envelope, HostTarget};
pub use transmit::transmit;

#[cfg(feature = "with-starttls")]
use native_tls::TlsConnector;

use crate::smtp::SmtpError;

/// The two SMTP dialogues the delivery engine needs.
pub trait SmtpTransport {
    fn probe(&self, target: &HostTarget, envelope: &Envelope<'_>) -> Result<(), SmtpError>;

    fn transmit(
        &self,
        target: &HostTarget,
        envelope: &Envelope<'_>,
        body: &[u8],
    ) -> Result<(), SmtpError>;
}

impl<T: SmtpTransport + ?Sized> SmtpTransport for &T {
    fn probe(&self, target: &HostTarget, envelope: &Envelope<'_>) -> Result<(), SmtpError> {
        (**self).probe(target, envelope)
    }

    fn transmit(
        &self,
        target: &HostTarget,
        envelope: &Envelope<'_>,
        body: &[u8],
    ) -> Result<(), SmtpError> {
        (**self).transmit(target, envelope, body)
    }
}

/// Real network transport.
#[derive(Debug)]
pub struct SmtpConnector {
    options: DeliveryOptions,
    #[cfg(feature = "with-starttls")]
    tls: TlsConnector,
}

impl SmtpConnector {
    pub fn new(options: DeliveryOptions) -> Result<Self, SmtpError> {
        Ok(Self {
            options,
            #[cfg(feature = "with-starttls")]
            tls: TlsConnector::new().map_err(|source| SmtpError::TlsInit { source })?,
        })
    }

    pub fn options(&self) -> &DeliveryOptions {
        &self.options
    }

    #[cfg(feature = "with-starttls")]
    pub(crate) fn tls(&self) -> &TlsConnector {
        &self.tls
    }
}

impl SmtpTransport for SmtpConnector {
    fn probe(&self, target: &HostTarget, envelope: &Envelope<'_>) -> Result<(), SmtpError> {
        probe::probe(self, target, envelope)
    }

    fn transmit(
        &self,
        target: &HostTarget,
        envelope: &Envelope<'_>,
        body: &[u8],
    ) -> Result<(), SmtpError> {
        transmit::transmit(self, target, envelope, body)
    }
}

#[cfg(test)]
mod tests;
