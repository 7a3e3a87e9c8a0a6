use trust_dns_resolver::Resolver;
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::proto::op::ResponseCode;

use super::{MxError, MxHost};

/// Raw DNS MX query, without caching or ordering guarantees.
///
/// Implemented for the system [`Resolver`]; tests substitute their own.
/// A domain that exists but publishes no MX record yields an empty list.
pub trait LookupMx {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxHost>, ResolveError>;
}

impl LookupMx for Resolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxHost>, ResolveError> {
        let lookup = match Resolver::mx_lookup(self, domain) {
            Ok(lookup) => lookup,
            Err(err) if is_empty_answer(&err) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        let mut hosts = Vec::new();
        for mx in lookup.iter() {
            let exchange = normalize_exchange(mx.exchange().to_utf8());
            hosts.push(MxHost::new(mx.preference(), exchange));
        }
        Ok(hosts)
    }
}

/// Build a resolver from the system configuration (`/etc/resolv.conf`).
pub fn system_resolver() -> Result<Resolver, MxError> {
    Resolver::from_system_conf().map_err(|source| MxError::ResolverInit { source })
}

// NXDOMAIN stays an error: the domain does not exist at all.
fn is_empty_answer(err: &ResolveError) -> bool {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => {
            *response_code != ResponseCode::NXDomain
        }
        _ => false,
    }
}

pub(crate) fn normalize_domain(domain: &str) -> Result<String, MxError> {
    let trimmed = domain.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(MxError::EmptyDomain);
    }
    idna::domain_to_ascii(trimmed).map_err(|source| MxError::invalid_domain(trimmed, source))
}

pub(crate) fn normalize_exchange(exchange: String) -> String {
    let trimmed = exchange.trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}
