use url::Url;

/// Extracts the lowercase host of a URL with any leading `www.` removed
///
/// # Examples
///
/// ```
/// use url::Url;
/// use llms_harvest::url::site_host;
///
/// let url = Url::parse("https://WWW.Example.com/path").unwrap();
/// assert_eq!(site_host(&url), Some("example.com".to_string()));
/// ```
pub fn site_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| {
        let host = h.to_lowercase();
        match host.strip_prefix("www.") {
            Some(bare) => bare.to_string(),
            None => host,
        }
    })
}

/// Returns true when `candidate` is on the same site as `site`
///
/// Both arguments may be any parseable URL strings. Hosts are compared
/// case-insensitively and a `www.` prefix on either side is ignored;
/// scheme and port are not considered.
pub fn is_internal(candidate: &str, site: &str) -> bool {
    match (Url::parse(candidate), Url::parse(site)) {
        (Ok(candidate), Ok(site)) => match (site_host(&candidate), site_host(&site)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        _ => false,
    }
}
