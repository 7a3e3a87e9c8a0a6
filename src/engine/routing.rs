use std::fmt;

use serde::{Serialize, Serializer};

use crate::delivery::HostTarget;

/// What a route delivers for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteKey {
    /// All recipients through the configured relay.
    Relay,
    Domain(String),
}

impl RouteKey {
    /// Table key: the empty string for the relay route, else the domain.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Relay => "",
            Self::Domain(domain) => domain,
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relay => f.write_str("relay"),
            Self::Domain(domain) => f.write_str(domain),
        }
    }
}

impl Serialize for RouteKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A validated delivery route: its recipients and the hosts to try, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub key: RouteKey,
    pub recipients: Vec<String>,
    pub hosts: Vec<HostTarget>,
}

/// Routes in the order they are delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoutingTable {
    routes: Vec<Route>,
}

impl RoutingTable {
    pub(crate) fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn get(&self, key: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.key.as_str() == key)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
