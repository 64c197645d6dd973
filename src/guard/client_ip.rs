use axum::http::HeaderMap;
use std::net::IpAddr;

/// Resolve the address a request is judged by.
///
/// When `trusted_header` is set and present, the first entry of its
/// comma-separated value is used, provided it is a valid IP literal.
/// Otherwise the transport peer address is used. The header is trusted
/// as-is: only configure one that a reverse proxy you control overwrites.
pub fn resolve_client_ip(headers: &HeaderMap, trusted_header: Option<&str>, peer: IpAddr) -> String {
    if let Some(name) = trusted_header {
        let first = headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|raw| raw.split(',').next())
            .map(str::trim);

        if let Some(candidate) = first {
            if candidate.parse::<IpAddr>().is_ok() {
                return candidate.to_string();
            }
            tracing::debug!("Ignoring invalid {} value: {:?}", name, candidate);
        }
    }

    // IPv4 clients on a dual-stack listener show up as ::ffff:a.b.c.d
    peer.to_canonical().to_string()
}
