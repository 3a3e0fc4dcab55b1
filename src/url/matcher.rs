/// Checks if a host belongs to a marketplace domain
///
/// This function supports two types of patterns:
/// 1. Plain domain: "example.com" matches the bare domain and a single
///    subdomain label in front of it ("sp.example.com", "www.example.com")
/// 2. Wildcard domain: "*.example.com" matches the bare domain and any depth
///    of subdomains ("a.b.example.com")
///
/// # Arguments
///
/// * `pattern` - The marketplace domain, optionally starting with "*."
/// * `candidate` - The lowercase host to check
///
/// # Examples
///
/// ```
/// use sumi_sieve::url::matches_domain;
///
/// assert!(matches_domain("example.com", "example.com"));
/// assert!(matches_domain("example.com", "sp.example.com"));
/// assert!(!matches_domain("example.com", "a.b.example.com"));
/// assert!(matches_domain("*.example.com", "a.b.example.com"));
/// assert!(!matches_domain("example.com", "example.com.evil.net"));
/// ```
pub fn matches_domain(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        return candidate == base || candidate.ends_with(&format!(".{}", base));
    }

    if candidate == pattern {
        return true;
    }

    match candidate.strip_suffix(pattern) {
        Some(prefix) => match prefix.strip_suffix('.') {
            Some(label) => is_subdomain_label(label),
            None => false,
        },
        None => false,
    }
}

/// A single DNS label: non-empty, alphanumerics and hyphens, no dots
fn is_subdomain_label(label: &str) -> bool {
    !label.is_empty()
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches_domain("olx.com.br", "olx.com.br"));
    }

    #[test]
    fn test_single_subdomain() {
        assert!(matches_domain("olx.com.br", "sp.olx.com.br"));
        assert!(matches_domain("olx.com.br", "www.olx.com.br"));
        assert!(matches_domain("olx.com.br", "rj-2.olx.com.br"));
    }

    #[test]
    fn test_nested_subdomain_rejected_without_wildcard() {
        assert!(!matches_domain("olx.com.br", "a.b.olx.com.br"));
    }

    #[test]
    fn test_wildcard_any_depth() {
        assert!(matches_domain("*.olx.com.br", "olx.com.br"));
        assert!(matches_domain("*.olx.com.br", "a.b.olx.com.br"));
        assert!(!matches_domain("*.olx.com.br", "olx.com.br.evil.net"));
    }

    #[test]
    fn test_lookalike_hosts_rejected() {
        assert!(!matches_domain("olx.com.br", "notolx.com.br"));
        assert!(!matches_domain("olx.com.br", "olx.com.br.evil.net"));
        assert!(!matches_domain("olx.com.br", ".olx.com.br"));
        assert!(!matches_domain("olx.com.br", "-x.olx.com.br"));
    }

    #[test]
    fn test_ip_host() {
        assert!(matches_domain("127.0.0.1", "127.0.0.1"));
        assert!(!matches_domain("127.0.0.1", "127.0.0.2"));
    }
}
