use thiserror::Error;
use trust_dns_resolver::error::ResolveError;

#[derive(Debug, Error)]
pub enum MxError {
    #[error("empty domain")]
    EmptyDomain,
    #[error("{domain} is not a valid domain name")]
    InvalidDomain {
        domain: String,
        #[source]
        source: idna::Errors,
    },
    #[error("cannot read the system resolver configuration: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },
    #[error("MX lookup for {domain} failed: {source}")]
    Lookup {
        domain: String,
        #[source]
        source: ResolveError,
    },
}

impl MxError {
    pub(crate) fn invalid_domain(domain: &str, source: idna::Errors) -> Self {
        Self::InvalidDomain {
            domain: domain.to_string(),
            source,
        }
    }

    pub(crate) fn lookup(domain: impl Into<String>, source: ResolveError) -> Self {
        Self::Lookup {
            domain: domain.into(),
            source,
        }
    }
}
