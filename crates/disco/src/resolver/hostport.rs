//! `host:port` composition and parsing.

/// Joins a host and port into `host:port`.
///
/// IPv6 literals are bracketed: `[2001:db8::68]:4001`.
#[must_use]
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Splits `addr` into host and port.
///
/// Accepts `host:port` and `[ipv6]:port`. Returns `None` when the port is
/// missing or not a valid `u16`, the host is empty, or an IPv6 host is not
/// bracketed.
#[must_use]
pub fn split_host_port(addr: &str) -> Option<(&str, u16)> {
    let (host, port) = if let Some(rest) = addr.strip_prefix('[') {
        let (host, port) = rest.split_once("]:")?;
        if !host.contains(':') || host.contains(['[', ']']) {
            return None;
        }
        (host, port)
    } else {
        let (host, port) = addr.rsplit_once(':')?;
        if host.contains([':', '[', ']']) {
            return None;
        }
        (host, port)
    };

    if host.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let port = port.parse().ok()?;
    Some((host, port))
}

/// Returns true if `addr` is a valid `host:port`.
#[must_use]
pub fn is_host_port(addr: &str) -> bool {
    split_host_port(addr).is_some()
}
