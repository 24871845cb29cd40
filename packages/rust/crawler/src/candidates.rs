//! Candidate page URLs probed for every domain.

/// Well-known paths probed after the site root, highest priority first.
pub const CANDIDATE_PATHS: [&str; 8] = [
    "/about",
    "/about-us",
    "/pricing",
    "/contact",
    "/contact-us",
    "/services",
    "/products",
    "/team",
];

/// Candidate URLs for `domain` over HTTPS: the root, then every [`CANDIDATE_PATHS`] entry.
pub fn build_urls(domain: &str) -> Vec<String> {
    build_urls_with_scheme("https", domain)
}

/// Same as [`build_urls`] with an explicit scheme (plain `http` for local mock servers).
pub fn build_urls_with_scheme(scheme: &str, domain: &str) -> Vec<String> {
    let origin = format!("{scheme}://{domain}");
    std::iter::once(format!("{origin}/"))
        .chain(CANDIDATE_PATHS.iter().map(|path| format!("{origin}{path}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_comes_first_then_fixed_paths() {
        let urls = build_urls("acme.com");
        assert_eq!(urls.len(), 1 + CANDIDATE_PATHS.len());
        assert_eq!(urls[0], "https://acme.com/");
        assert_eq!(urls[1], "https://acme.com/about");
        assert_eq!(urls[3], "https://acme.com/pricing");
        assert_eq!(urls.last().map(String::as_str), Some("https://acme.com/team"));
    }

    #[test]
    fn deterministic() {
        assert_eq!(build_urls("example.org"), build_urls("example.org"));
    }

    #[test]
    fn explicit_scheme_and_port() {
        let urls = build_urls_with_scheme("http", "127.0.0.1:4000");
        assert_eq!(urls[0], "http://127.0.0.1:4000/");
        assert_eq!(urls[4], "http://127.0.0.1:4000/contact");
    }
}
