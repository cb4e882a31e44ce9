//! Geo-IP collaborator seam
//!
//! The collector does not ship a geo database; it consumes an external
//! lookup through the [`GeoResolver`] trait and owns only the redaction
//! rule: a submitter address that fails to resolve must never leak into
//! stored records as a raw IP.

/// Address used when no `x-forwarded-for` header is present
pub const LOOPBACK: &str = "127.0.0.1";

/// Marker stored instead of an unresolvable non-loopback address
pub const REDACTED: &str = "redacted";

/// Result of a geo lookup
#[derive(Debug, Clone)]
pub struct GeoInfo {
    /// Coarse location code (country level), if the address resolved
    pub code: Option<String>,
    /// The address that was looked up
    pub ip: String,
}

/// External geo lookup, `ip -> {code, ip}`
pub trait GeoResolver: Send + Sync {
    fn resolve(&self, ip: &str) -> GeoInfo;
}

/// Resolver used when no geo database is wired in: nothing resolves, so
/// every non-loopback submitter is recorded as redacted.
#[derive(Debug, Default)]
pub struct PassthroughGeoResolver;

impl GeoResolver for PassthroughGeoResolver {
    fn resolve(&self, ip: &str) -> GeoInfo {
        GeoInfo {
            code: None,
            ip: ip.to_string(),
        }
    }
}

/// Location string recorded with a submission.
///
/// `forwarded_for` is the raw `x-forwarded-for` value; absent means a
/// direct (loopback) connection. Loopback is kept verbatim so local
/// development batches remain distinguishable.
pub fn session_geo(resolver: &dyn GeoResolver, forwarded_for: Option<&str>) -> String {
    let ip = forwarded_for.unwrap_or(LOOPBACK);
    let geo = resolver.resolve(ip);
    match geo.code {
        Some(code) => code,
        None if geo.ip == LOOPBACK => geo.ip,
        None => REDACTED.to_string(),
    }
}
