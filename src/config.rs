use std::path::Path;

use url::Url;

use crate::endpoints::{DEFAULT_CONTRIBS_HOST, DEFAULT_MP_ENDPOINT, contribs_host_to_base_url};
use crate::error::{Error, Result};

pub const API_KEY_VAR: &str = "MP_API_KEY";
pub const MP_ENDPOINT_VAR: &str = "MP_API_ENDPOINT";
pub const CONTRIBS_HOST_VAR: &str = "MPCONTRIBS_API_HOST";

/// Resolved process configuration.
///
/// Loaded once at program start and passed explicitly to clients; nothing
/// below this layer reads the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    pub mp_endpoint: String,
    pub contribs_url: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("mp_endpoint", &self.mp_endpoint)
            .field("contribs_url", &self.contribs_url)
            .finish()
    }
}

impl Config {
    /// Load `.env` from the working directory (if present), then read the
    /// process environment.
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("ignoring unreadable .env: {e}"),
        }
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Read a specific dotenv file. Process variables take precedence over
    /// values from the file.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let iter = dotenvy::from_path_iter(path).map_err(|e| {
            Error::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;

        let mut file_vars = Vec::new();
        for item in iter {
            let (k, v) = item.map_err(|e| {
                Error::InvalidConfig(format!("cannot parse {}: {e}", path.display()))
            })?;
            file_vars.push((k, v));
        }

        Self::from_lookup(|key| {
            std::env::var(key).ok().or_else(|| {
                file_vars
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| v.clone())
            })
        })
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup(API_KEY_VAR)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(Error::MissingApiKey(API_KEY_VAR))?;

        let mp_endpoint = lookup(MP_ENDPOINT_VAR)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MP_ENDPOINT.to_string());
        let mp_endpoint = validate_url(MP_ENDPOINT_VAR, &mp_endpoint)?;

        let contribs_host = lookup(CONTRIBS_HOST_VAR)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONTRIBS_HOST.to_string());
        let contribs_url = validate_url(CONTRIBS_HOST_VAR, &contribs_host_to_base_url(&contribs_host))?;

        Ok(Self {
            api_key,
            mp_endpoint,
            contribs_url,
        })
    }
}

fn validate_url(var: &str, raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed)
        .map_err(|e| Error::InvalidConfig(format!("{var}={raw}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(Error::InvalidConfig(format!("{var}={raw}: not a base url")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::io::Write;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn missing_key_is_configuration_error() {
        let err = Config::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, Error::MissingApiKey("MP_API_KEY")));
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "MP_API_KEY not found in environment variables");
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let err = Config::from_lookup(lookup_from(&[("MP_API_KEY", "   ")])).unwrap_err();
        assert!(matches!(err, Error::MissingApiKey(_)));
    }

    #[test]
    fn defaults_fill_endpoints() {
        let cfg = Config::from_lookup(lookup_from(&[("MP_API_KEY", "abc")])).unwrap();
        assert_eq!(cfg.api_key, "abc");
        assert_eq!(cfg.mp_endpoint, "https://api.materialsproject.org");
        assert_eq!(cfg.contribs_url, "https://contribs-api.materialsproject.org");
    }

    #[test]
    fn overrides_are_validated() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("MP_API_KEY", "abc"),
            ("MP_API_ENDPOINT", "http://localhost:8000/"),
            ("MPCONTRIBS_API_HOST", "localhost:5000"),
        ]))
        .unwrap();
        assert_eq!(cfg.mp_endpoint, "http://localhost:8000");
        assert_eq!(cfg.contribs_url, "https://localhost:5000");

        let err = Config::from_lookup(lookup_from(&[
            ("MP_API_KEY", "abc"),
            ("MP_API_ENDPOINT", "not a url"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn debug_redacts_key() {
        let cfg = Config::from_lookup(lookup_from(&[("MP_API_KEY", "secret-key")])).unwrap();
        let shown = format!("{cfg:?}");
        assert!(!shown.contains("secret-key"));
        assert!(shown.contains("<redacted>"));
    }

    #[test]
    fn reads_dotenv_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "MPCONTRIBS_API_HOST=http://127.0.0.1:9999").unwrap();
        writeln!(file, "MP_API_KEY_UNUSED=nope").unwrap();
        file.flush().unwrap();

        // Only exercise the file when the test process doesn't define the key.
        if std::env::var(API_KEY_VAR).is_err() {
            let err = Config::from_env_file(file.path()).unwrap_err();
            assert!(matches!(err, Error::MissingApiKey(_)));
        }

        let mut file2 = tempfile::NamedTempFile::new().unwrap();
        writeln!(file2, "MP_API_KEY=from-file").unwrap();
        writeln!(file2, "MPCONTRIBS_API_HOST=http://127.0.0.1:9999").unwrap();
        file2.flush().unwrap();

        let cfg = Config::from_env_file(file2.path()).unwrap();
        if std::env::var(API_KEY_VAR).is_err() {
            assert_eq!(cfg.api_key, "from-file");
        }
        if std::env::var(CONTRIBS_HOST_VAR).is_err() {
            assert_eq!(cfg.contribs_url, "http://127.0.0.1:9999");
        }
    }

    #[test]
    fn missing_dotenv_file_is_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_env_file(dir.path().join("absent.env")).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
