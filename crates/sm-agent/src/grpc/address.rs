//! Endpoint address handling

/// Hostname portion of a `host[:port]` endpoint, used as the TLS server name.
///
/// Splits on the *last* colon. An unbracketed IPv6 literal therefore loses
/// its final group (`"::1"` becomes `":"`); callers that need IPv6 must
/// configure a hostname instead.
pub fn resolve_host(endpoint: &str) -> &str {
    match endpoint.rfind(':') {
        Some(pos) => &endpoint[..pos],
        None => endpoint,
    }
}
