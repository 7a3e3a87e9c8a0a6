use super::ConfigError;

/// Split a relay `host[:port]` into its parts, defaulting the port.
///
/// Bracketed IPv6 literals (`[::1]:2525`) are accepted; an unbracketed value
/// with more than one colon is taken as a bare IPv6 host.
pub(crate) fn parse_host_port(
    address: &str,
    default_port: u16,
) -> Result<(String, u16), ConfigError> {
    let address = address.trim();

    let (host, port) = if let Some(rest) = address.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| ConfigError::invalid_relay(address, "unterminated '['"))?;
        match tail {
            "" => (host, None),
            _ => match tail.strip_prefix(':') {
                Some(port) => (host, Some(port)),
                None => {
                    return Err(ConfigError::invalid_relay(
                        address,
                        "unexpected text after ']'",
                    ));
                }
            },
        }
    } else if address.matches(':').count() > 1 {
        (address, None)
    } else {
        match address.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (address, None),
        }
    };

    if host.is_empty() {
        return Err(ConfigError::invalid_relay(address, "host is empty"));
    }

    let port = match port {
        None => default_port,
        Some(raw) => match raw.parse::<u16>() {
            Ok(0) | Err(_) => {
                return Err(ConfigError::invalid_relay(
                    address,
                    format!("invalid port '{raw}'"),
                ));
            }
            Ok(port) => port,
        },
    };

    Ok((host.to_string(), port))
}
