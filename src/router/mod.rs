//! Recipient partitioning by destination domain.

use serde::Serialize;

use crate::config::ConfigError;

/// Recipients that share a destination domain, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientGroup {
    /// Lowercased domain part shared by every address of the group.
    pub domain: String,
    pub addresses: Vec<String>,
}

/// Partition `recipients` into per-domain groups.
///
/// Groups come out in the order their domain first appears; each address keeps
/// its relative position inside its group. Domains are compared without regard
/// to ASCII case. An address without a usable `local@domain` shape is rejected.
pub fn route_recipients<S: AsRef<str>>(
    recipients: &[S],
) -> Result<Vec<RecipientGroup>, ConfigError> {
    let mut groups: Vec<RecipientGroup> = Vec::new();
    for recipient in recipients {
        let address = recipient.as_ref();
        let (_, domain) = split_address(address)?;
        let domain = domain.to_ascii_lowercase();
        match groups.iter_mut().find(|group| group.domain == domain) {
            Some(group) => group.addresses.push(address.to_string()),
            None => groups.push(RecipientGroup {
                domain,
                addresses: vec![address.to_string()],
            }),
        }
    }
    Ok(groups)
}

/// Split `local@domain` on its last `@`.
pub fn split_address(address: &str) -> Result<(&str, &str), ConfigError> {
    let (local, domain) = address
        .rsplit_once('@')
        .ok_or_else(|| ConfigError::malformed(address, "missing '@'"))?;
    if local.is_empty() {
        return Err(ConfigError::malformed(address, "empty local part"));
    }
    if domain.is_empty() {
        return Err(ConfigError::malformed(address, "empty domain"));
    }
    if address.chars().any(|c| c.is_whitespace() || c == '<' || c == '>') {
        return Err(ConfigError::malformed(
            address,
            "whitespace or angle bracket in address",
        ));
    }
    Ok((local, domain))
}
