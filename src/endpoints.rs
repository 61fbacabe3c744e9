/// Default Materials Project API endpoint (same value `mp_api` ships with).
pub const DEFAULT_MP_ENDPOINT: &str = "https://api.materialsproject.org";

/// Default MPContribs API host.
pub const DEFAULT_CONTRIBS_HOST: &str = "contribs-api.materialsproject.org";

/// Resolve an MPContribs host setting to a base URL.
///
/// Bare host names get `https://`; `http(s)` URLs are used as-is.
pub fn contribs_host_to_base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if is_http_url(host) {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

pub fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}
