//! URL to domain canonicalization.
//!
//! Two forms are derived from a free-form URL:
//! - the canonical host (scheme, `www.`, port and path removed, lowercased)
//! - the registrable domain (canonical host reduced to label + public suffix)

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::net::IpAddr;
use tracing::debug;
use url::Url;

static SCHEME_WWW_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:http://|https://)?(?:www\.)?").expect("Invalid scheme prefix regex")
});

/// Both comparable forms of one URL cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CanonicalDomain {
    /// Canonical host, `None` when the URL is missing or unparseable
    pub host: Option<String>,
    /// Registrable domain derived from `host`
    pub registrable: Option<String>,
}

impl CanonicalDomain {
    pub fn from_url(url: Option<&str>) -> Self {
        let host = url.and_then(canonical_host);
        let registrable = host.as_deref().map(registrable_domain);
        Self { host, registrable }
    }

    pub fn is_missing(&self) -> bool {
        self.host.is_none()
    }
}

/// Canonicalize a URL into its lowercase host with scheme and `www.` removed.
///
/// Never fails: anything that does not yield a non-empty host maps to `None`.
pub fn canonical_host(url: &str) -> Option<String> {
    let lowered = url.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }

    let stripped = SCHEME_WWW_PREFIX.replace(&lowered, "");
    let stripped = stripped
        .trim_matches('/')
        .trim()
        .trim_end_matches('/');
    if stripped.is_empty() {
        return None;
    }

    // Force a scheme on so the parser treats the leading segment as the host
    let parsed = match Url::parse(&format!("http://{}", stripped)) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("Could not parse URL '{}': {}", url, e);
            return None;
        }
    };

    let mut host = parsed.host_str()?.to_lowercase();

    // A residual www. survives when the first pass saw an unexpected prefix
    while let Some(rest) = host.strip_prefix("www.") {
        host = rest.to_string();
    }

    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Reduce a canonical host to its registrable domain (e.g. shop.acme.co.uk -> acme.co.uk).
///
/// Uses the Public Suffix List. IP hosts, and hosts that are themselves a
/// public suffix, come back unchanged.
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.');

    if is_ip_host(host) {
        return host.to_string();
    }

    match psl::domain_str(host) {
        Some(domain) => domain.to_string(),
        None => {
            debug!("No registrable domain under a public suffix for '{}'", host);
            host.to_string()
        }
    }
}

fn is_ip_host(host: &str) -> bool {
    host.starts_with('[') || host.parse::<IpAddr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_host_strips_scheme_and_www() {
        assert_eq!(canonical_host("http://www.acme-solutions.be"), Some("acme-solutions.be".to_string()));
        assert_eq!(canonical_host("https://acme.be/contact"), Some("acme.be".to_string()));
        assert_eq!(canonical_host("www.acme.be/"), Some("acme.be".to_string()));
        assert_eq!(canonical_host("acme.be"), Some("acme.be".to_string()));
    }

    #[test]
    fn test_canonical_host_lowercases() {
        assert_eq!(canonical_host("HTTPS://WWW.ACME.BE/Over-Ons"), Some("acme.be".to_string()));
    }

    #[test]
    fn test_canonical_host_drops_port_query_and_path() {
        assert_eq!(canonical_host("http://shop.acme.be:8080/a/b?c=d#e"), Some("shop.acme.be".to_string()));
    }

    #[test]
    fn test_canonical_host_second_www_pass() {
        // The prefix regex only removes one www.; the host pass removes the rest
        assert_eq!(canonical_host("www.www.acme.be"), Some("acme.be".to_string()));
        // Leading slashes hide the www. from the prefix regex
        assert_eq!(canonical_host("//www.acme.be"), Some("acme.be".to_string()));
    }

    #[test]
    fn test_canonical_host_missing_and_unparseable() {
        assert_eq!(canonical_host(""), None);
        assert_eq!(canonical_host("   "), None);
        assert_eq!(canonical_host("https://"), None);
        assert_eq!(canonical_host("http://www."), None);
        assert_eq!(canonical_host("acme solutions.be"), None);
    }

    #[test]
    fn test_canonical_host_is_idempotent() {
        let inputs = [
            "http://www.acme-solutions.be",
            "https://shop.acme.co.uk/path",
            "WWW.Example.COM",
            "www.www.acme.be",
            "192.168.1.10:8000/admin",
        ];
        for input in inputs {
            let once = canonical_host(input).unwrap();
            let twice = canonical_host(&once).unwrap();
            assert_eq!(once, twice, "canonicalization not idempotent for {}", input);
        }
    }

    #[test]
    fn test_registrable_domain() {
        assert_eq!(registrable_domain("acme.be"), "acme.be");
        assert_eq!(registrable_domain("shop.acme.be"), "acme.be");
        assert_eq!(registrable_domain("a.b.acme.com"), "acme.com");
        assert_eq!(registrable_domain("localhost"), "localhost");
    }

    #[test]
    fn test_registrable_domain_compound_suffix() {
        assert_eq!(registrable_domain("mail.example.co.uk"), "example.co.uk");
        assert_eq!(registrable_domain("example.co.uk"), "example.co.uk");
        assert_eq!(registrable_domain("api.company.com.au"), "company.com.au");
    }

    #[test]
    fn test_registrable_domain_uses_public_suffix_list() {
        assert_eq!(registrable_domain("acme.com.pl"), "acme.com.pl");
        assert_eq!(registrable_domain("shop.other.com.pl"), "other.com.pl");
        assert_eq!(registrable_domain("www2.acme.co.il"), "acme.co.il");
        assert_ne!(registrable_domain("acme.co.il"), registrable_domain("other.co.il"));
    }

    #[test]
    fn test_registrable_domain_of_bare_suffix() {
        assert_eq!(registrable_domain("co.uk"), "co.uk");
        assert_eq!(registrable_domain("com.pl"), "com.pl");
    }

    #[test]
    fn test_registrable_domain_ip_host_unchanged() {
        assert_eq!(registrable_domain("192.168.1.10"), "192.168.1.10");
        assert_eq!(registrable_domain("[::1]"), "[::1]");
    }

    #[test]
    fn test_registrable_domain_is_idempotent() {
        for host in ["shop.acme.be", "mail.example.co.uk", "shop.acme.com.pl", "acme.be", "10.0.0.1"] {
            let once = registrable_domain(host);
            assert_eq!(registrable_domain(&once), once);
        }
    }

    #[test]
    fn test_canonical_domain_from_url() {
        let d = CanonicalDomain::from_url(Some("https://www.shop.acme.be/nl"));
        assert_eq!(d.host.as_deref(), Some("shop.acme.be"));
        assert_eq!(d.registrable.as_deref(), Some("acme.be"));

        let missing = CanonicalDomain::from_url(None);
        assert!(missing.is_missing());
        assert_eq!(missing.registrable, None);
    }
}
