use serde::Serialize;

/// A mail exchanger for a domain. Ordering is by ascending preference, which
/// is the order exchangers are tried in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MxHost {
    pub preference: u16,
    pub exchange: String,
}

impl MxHost {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: exchange.into(),
        }
    }
}
