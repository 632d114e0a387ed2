use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use http::{HeaderMap, HeaderName, Request};

pub static X_FORWARDED_FOR_HEADER: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Picks the address used to classify a request.
///
/// With `prefer_forwarded_header` set, the leftmost `X-Forwarded-For` entry
/// wins. Clients can put anything there, so only enable it behind a proxy
/// that rewrites the header. Otherwise the connection address is used with
/// its port stripped.
pub fn client_ip(
    headers: &HeaderMap,
    remote_addr: Option<&str>,
    prefer_forwarded_header: bool,
) -> Option<String> {
    if prefer_forwarded_header {
        if let Some(forwarded_for) = headers
            .get(&X_FORWARDED_FOR_HEADER)
            .filter(|value| !value.is_empty())
        {
            let forwarded_for = String::from_utf8_lossy(forwarded_for.as_bytes());
            let first = forwarded_for.split(',').next().unwrap_or_default().trim();
            return non_empty(first);
        }
    }

    let remote_addr = remote_addr?;
    non_empty(split_host_port(remote_addr).unwrap_or(remote_addr))
}

/// The peer address axum recorded for this connection, if the server was
/// started with connect info.
pub fn remote_addr<B>(req: &Request<B>) -> Option<String> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
}

fn non_empty(ip: &str) -> Option<String> {
    if ip.is_empty() {
        None
    } else {
        Some(ip.to_string())
    }
}

/// Returns the host part of `host:port` or `[host]:port`, or `None` when the
/// address has no port.
fn split_host_port(addr: &str) -> Option<&str> {
    if let Some(bracketed) = addr.strip_prefix('[') {
        let (host, rest) = bracketed.split_once(']')?;
        return rest.strip_prefix(':').map(|_| host);
    }
    let (host, _port) = addr.rsplit_once(':')?;
    // a bare ipv6 address has more than one colon and no port
    if host.contains(':') {
        return None;
    }
    Some(host)
}
