//! Public-address guard
//!
//! Keeps fetches (and the redirects they follow) out of loopback, private,
//! link-local and other non-routable ranges.

use crate::UrlError;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use thiserror::Error;
use url::{Host, Url};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Hostname suffixes that only ever name internal machines
const BLOCKED_HOST_SUFFIXES: &[&str] = &[".localhost", ".internal", ".local"];

/// Raised by the redirect policy or the resolver when a connection would reach a
/// non-public host
#[derive(Debug, Error)]
#[error("non-public address {0}")]
pub struct BlockedTarget(pub String);

/// DNS resolver that only hands public addresses to the connector
///
/// Installed on the HTTP client, it applies the guard at connect time on every
/// hop, so neither a redirect to an innocuous-looking name nor a DNS answer that
/// changed since [`ensure_public_target`] ran can reach an internal address.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicResolver;

impl Resolve for PublicResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let host = name.as_str().to_string();
        Box::pin(async move {
            let addrs: Addrs = Box::new(resolve_public(&host).await?.into_iter());
            Ok(addrs)
        })
    }
}

/// Resolves `host` and keeps only its public addresses
///
/// Fails with [`BlockedTarget`] when the host resolves, but only to non-public
/// addresses.
pub async fn resolve_public(host: &str) -> Result<Vec<SocketAddr>, BoxError> {
    let resolved: Vec<SocketAddr> = tokio::net::lookup_host((host, 0)).await?.collect();
    if resolved.is_empty() {
        return Err(format!("no addresses found for {}", host).into());
    }

    let public = public_addrs(resolved);
    if public.is_empty() {
        tracing::warn!("Refusing to connect to {}: no public address", host);
        return Err(Box::new(BlockedTarget(host.to_string())));
    }
    Ok(public)
}

/// Drops loopback, private and other non-routable addresses
pub fn public_addrs(addrs: impl IntoIterator<Item = SocketAddr>) -> Vec<SocketAddr> {
    addrs
        .into_iter()
        .filter(|addr| is_public_ip(addr.ip()))
        .collect()
}

/// Returns true for globally routable unicast addresses
pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => is_public_v6(v6),
    }
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    let octets = ip.octets();
    let shared = octets[0] == 100 && (octets[1] & 0xc0) == 64; // 100.64.0.0/10
    !(ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_multicast()
        || octets[0] == 0
        || shared)
}

fn is_public_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_public_v4(v4);
    }
    let first = ip.segments()[0];
    let unique_local = (first & 0xfe00) == 0xfc00;
    let link_local = (first & 0xffc0) == 0xfe80;
    !(ip.is_loopback() || ip.is_unspecified() || ip.is_multicast() || unique_local || link_local)
}

/// Checks the host of a URL without touching DNS
///
/// Returns the offending host when it is an internal name or a non-public IP literal.
pub fn literal_target_blocked(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Ipv4(ip) => (!is_public_v4(ip)).then(|| ip.to_string()),
        Host::Ipv6(ip) => (!is_public_v6(ip)).then(|| ip.to_string()),
        Host::Domain(domain) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            let internal = domain == "localhost"
                || BLOCKED_HOST_SUFFIXES
                    .iter()
                    .any(|suffix| domain.ends_with(suffix));
            internal.then_some(domain)
        }
    }
}

/// Verifies that a URL may be fetched
///
/// Rejects non-HTTP(S) schemes, URLs without a host, internal hostnames, non-public
/// IP literals and hostnames that resolve to a non-public address. A failed DNS
/// lookup is not an error here; the fetch itself will report it.
///
/// With `allow_private` only the scheme and host checks run.
pub async fn ensure_public_target(url: &Url, allow_private: bool) -> Result<(), UrlError> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host().is_none() {
        return Err(UrlError::MissingDomain);
    }

    if allow_private {
        return Ok(());
    }

    if let Some(host) = literal_target_blocked(url) {
        return Err(UrlError::Blocked(host));
    }

    if let Some(Host::Domain(domain)) = url.host() {
        let port = url.port_or_known_default().unwrap_or(80);
        match tokio::net::lookup_host((domain, port)).await {
            Ok(addrs) => {
                for addr in addrs {
                    if !is_public_ip(addr.ip()) {
                        return Err(UrlError::Blocked(format!(
                            "{} resolves to {}",
                            domain,
                            addr.ip()
                        )));
                    }
                }
            }
            Err(e) => {
                tracing::debug!("DNS lookup for {} failed: {}", domain, e);
            }
        }
    }

    Ok(())
}
