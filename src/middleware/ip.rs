//! Client address resolution.
//!
//! The request gate and the route rate limiter key their state by the
//! best-effort originating client address.
//!
//! # Header Priority
//!
//! 1. `X-Forwarded-For` (first entry of the comma-separated chain)
//! 2. `X-Real-IP`
//! 3. `CF-Connecting-IP`
//! 4. The TCP peer address (`ConnectInfo<SocketAddr>`), when the server was
//!    started with connect info
//! 5. [`UNKNOWN_ADDRESS`]
//!
//! Header entries must parse as an IP address (optionally with a port); any
//! other value is skipped and the next source is tried. Addresses are keyed
//! in canonical form.
//!
//! # IP Spoofing
//!
//! Forwarding headers are client-controlled. When `TRUSTED_PROXIES` is set and
//! the peer address is known, headers are honoured only if the peer lies in a
//! trusted range; otherwise the peer address itself is used. With no trusted
//! ranges configured every forwarding header is believed, which is only safe
//! behind a proxy that overwrites them.
//!
//! ```nginx
//! proxy_set_header X-Real-IP $remote_addr;
//! proxy_set_header X-Forwarded-For $remote_addr;
//! ```

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::HeaderMap;
use axum::http::Request;
use tracing::{debug, warn};

/// Fallback address when no client address can be determined.
///
/// All such requests share one key, so they are collectively tracked and
/// rate-limited.
pub const UNKNOWN_ADDRESS: &str = "unknown";

const FORWARDING_HEADERS: [&str; 3] = ["x-forwarded-for", "x-real-ip", "cf-connecting-ip"];

// =============================================================================
// Trusted Proxy CIDR Matching
// =============================================================================

/// Parsed CIDR network range.
#[derive(Debug, Clone)]
pub struct CidrRange {
    network: IpAddr,
    prefix_len: u8,
}

impl CidrRange {
    /// Parse CIDR notation (e.g., "10.0.0.0/8" or "::1/128"); a bare address
    /// is treated as /32 or /128.
    pub fn parse(cidr: &str) -> Option<Self> {
        let (addr, prefix) = match cidr.trim().split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (cidr.trim(), None),
        };

        let network: IpAddr = addr.parse().ok()?;
        let max_prefix = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };

        let prefix_len = match prefix {
            Some(p) => p.parse::<u8>().ok().filter(|p| *p <= max_prefix)?,
            None => max_prefix,
        };

        Some(Self {
            network,
            prefix_len,
        })
    }

    /// Check if an address falls within this range.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (&self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(addr)) => {
                let mask = u32::MAX
                    .checked_shl(32 - u32::from(self.prefix_len))
                    .unwrap_or(0);
                (u32::from(*net) & mask) == (u32::from(*addr) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(addr)) => {
                let mask = u128::MAX
                    .checked_shl(128 - u32::from(self.prefix_len))
                    .unwrap_or(0);
                (u128::from(*net) & mask) == (u128::from(*addr) & mask)
            }
            _ => false,
        }
    }
}

/// Trusted reverse proxy ranges.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxyConfig {
    ranges: Vec<CidrRange>,
}

impl TrustedProxyConfig {
    /// Build from CIDR strings. Invalid entries are logged and skipped.
    pub fn new(cidrs: &[String]) -> Self {
        let ranges: Vec<CidrRange> = cidrs
            .iter()
            .filter_map(|cidr| {
                let parsed = CidrRange::parse(cidr);
                if parsed.is_none() {
                    warn!(cidr = %cidr, "Invalid CIDR range in TRUSTED_PROXIES, skipping");
                }
                parsed
            })
            .collect();

        Self { ranges }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ranges.is_empty()
    }

    /// Whether `ip` may set forwarding headers. Everything is trusted when no
    /// ranges are configured.
    pub fn is_trusted(&self, ip: &IpAddr) -> bool {
        !self.is_enabled() || self.ranges.iter().any(|range| range.contains(ip))
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Parse a forwarding header entry: a bare address, `ip:port` or `[v6]:port`.
fn parse_client_ip(value: &str) -> Option<IpAddr> {
    let value = value.trim();
    value
        .parse::<IpAddr>()
        .ok()
        .or_else(|| value.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

/// First forwarding header whose leading entry parses as an IP address.
///
/// Entries that are not addresses are skipped so a client cannot mint fresh
/// identities from arbitrary strings.
fn forwarded_address(headers: &HeaderMap) -> Option<IpAddr> {
    FORWARDING_HEADERS.iter().find_map(|name| {
        let value = headers.get(*name)?.to_str().ok()?;
        // "client, proxy1, proxy2" - the first entry is the client
        let first = value.split(',').next()?;
        let parsed = parse_client_ip(first);
        if parsed.is_none() && !first.trim().is_empty() {
            debug!(header = %name, "Ignoring forwarding header that is not an IP address");
        }
        parsed
    })
}

/// Resolve the client address from headers and an optional peer address.
///
/// The result is the canonical textual form of an [`IpAddr`], or
/// [`UNKNOWN_ADDRESS`].
pub fn resolve_address(
    headers: &HeaderMap,
    peer: Option<IpAddr>,
    trusted_proxies: &TrustedProxyConfig,
) -> String {
    match (forwarded_address(headers), peer) {
        (Some(forwarded), Some(peer)) if !trusted_proxies.is_trusted(&peer) => {
            warn!(
                peer = %peer,
                forwarded = %forwarded,
                "Forwarding header from untrusted peer ignored"
            );
            peer.to_string()
        }
        (Some(forwarded), _) => forwarded.to_string(),
        (None, Some(peer)) => peer.to_string(),
        (None, None) => {
            debug!("No client address available - request may be bypassing reverse proxy");
            UNKNOWN_ADDRESS.to_string()
        }
    }
}

/// Resolve the client address of a request.
///
/// Uses `ConnectInfo<SocketAddr>` from request extensions when present.
pub fn resolve_client_address<B>(
    req: &Request<B>,
    trusted_proxies: &TrustedProxyConfig,
) -> String {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    resolve_address(req.headers(), peer, trusted_proxies)
}
