use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::resolver::{LookupMx, normalize_domain, system_resolver};
use super::{MxError, MxHost};

/// Capability to turn a domain into its mail exchangers, most preferred first.
pub trait ResolveMx: Send + Sync {
    fn resolve(&self, domain: &str) -> Result<Arc<[MxHost]>, MxError>;
}

type Entries = HashMap<String, Arc<[MxHost]>>;

/// Process-wide MX cache shared by every delivery engine.
///
/// Entries never expire. A successful answer is stored once and served from
/// memory afterwards; failures are never stored, so a later call queries DNS
/// again. The lock only guards map access: the DNS query itself runs without
/// it, so two engines missing on the same domain at once may both query, and
/// the last answer written wins.
pub struct MxCache {
    lookup: Box<dyn LookupMx + Send + Sync>,
    entries: Mutex<Entries>,
}

impl MxCache {
    pub fn new<L>(lookup: L) -> Self
    where
        L: LookupMx + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cache backed by the system DNS resolver.
    pub fn from_system_conf() -> Result<Self, MxError> {
        Ok(Self::new(system_resolver()?))
    }

    /// Cached exchangers for `domain`, without touching DNS.
    pub fn cached(&self, domain: &str) -> Option<Arc<[MxHost]>> {
        let key = normalize_domain(domain).ok()?;
        self.entries().get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        // The map is only ever replaced entry by entry, so a poisoned lock still
        // holds consistent data.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResolveMx for MxCache {
    fn resolve(&self, domain: &str) -> Result<Arc<[MxHost]>, MxError> {
        let ascii = normalize_domain(domain)?;
        if let Some(hosts) = self.entries().get(&ascii).cloned() {
            debug!(domain = %ascii, hosts = hosts.len(), "MX cache hit");
            return Ok(hosts);
        }

        debug!(domain = %ascii, "MX cache miss, querying DNS");
        let mut hosts = self
            .lookup
            .lookup_mx(&ascii)
            .map_err(|source| MxError::lookup(&ascii, source))?;
        // Stable: equal preferences keep the order DNS returned them in.
        hosts.sort_by_key(|mx| mx.preference);
        let mut seen = HashSet::new();
        hosts.retain(|mx| seen.insert(mx.clone()));
        if hosts.is_empty() {
            // RFC 5321 section 5.1: no MX means the domain is its own exchanger.
            debug!(domain = %ascii, "no MX records, using implicit MX");
            hosts.push(MxHost::new(0, ascii.clone()));
        }

        let hosts: Arc<[MxHost]> = hosts.into();
        self.entries().insert(ascii, Arc::clone(&hosts));
        Ok(hosts)
    }
}

impl std::fmt::Debug for MxCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MxCache")
            .field("domains", &self.len())
            .finish_non_exhaustive()
    }
}
