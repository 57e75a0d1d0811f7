//! Target resolution: URL to domain, then through user-configured aliases.

use std::collections::HashMap;

/// Sentinel target used when a URL cannot be resolved.
pub const UNKNOWN_TARGET: &str = "unknown";

/// Extracts the host from a navigated URL.
///
/// Accepts anything of the shape `scheme://host[:port][/path]` and returns
/// the lowercased host. Unparsable input (no scheme, empty host, data URIs
/// and the like) yields [`UNKNOWN_TARGET`]; resolution failure is recovered
/// locally and never propagated.
#[must_use]
pub fn extract_domain(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return UNKNOWN_TARGET.to_string();
    };
    let scheme_ok = !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.');
    if !scheme_ok {
        return UNKNOWN_TARGET.to_string();
    }
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    // Strip userinfo and port.
    let host = authority.rsplit('@').next().unwrap_or(authority);
    let host = host.split(':').next().unwrap_or(host);
    if host.is_empty() {
        return UNKNOWN_TARGET.to_string();
    }
    host.to_ascii_lowercase()
}

/// Maps resolved domains through a user-configured alias table.
///
/// Aliases let a user fold raw domains into friendlier names (for example
/// `github.com` -> `GitHub`). A domain without an alias passes through
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct TargetResolver {
    aliases: HashMap<String, String>,
}

impl TargetResolver {
    /// Creates a resolver with the given alias table.
    #[must_use]
    pub const fn new(aliases: HashMap<String, String>) -> Self {
        Self { aliases }
    }

    /// Resolves a URL to its final target name.
    #[must_use]
    pub fn resolve_url(&self, url: &str) -> String {
        self.resolve_domain(extract_domain(url))
    }

    /// Applies the alias table to an already-extracted domain.
    #[must_use]
    pub fn resolve_domain(&self, domain: String) -> String {
        self.aliases.get(&domain).cloned().unwrap_or(domain)
    }
}
