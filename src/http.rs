use std::time::Duration;

use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Error, Result};

const TIMEOUT: Duration = Duration::from_secs(60);

/// Blocking client that sends `key_header: api_key` on every request.
pub(crate) fn build_http(key_header: &'static str, api_key: &str) -> Result<HttpClient> {
    let mut key = HeaderValue::from_str(api_key)
        .map_err(|_| Error::InvalidConfig("api key contains invalid header characters".into()))?;
    key.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("mp-fetch-rs/0.1"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(HeaderName::from_static(key_header), key);

    let http = HttpClient::builder()
        .default_headers(headers)
        .timeout(TIMEOUT)
        .build()?;
    Ok(http)
}

pub(crate) fn get_json<T: DeserializeOwned>(http: &HttpClient, url: Url) -> Result<T> {
    tracing::debug!(%url, "GET");
    let resp = check_status(http.get(url).send()?)?;
    let body = resp.text()?;
    Ok(serde_json::from_str(&body)?)
}

/// Turn non-2xx responses into [`Error::Api`], keeping the server's message.
fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(Error::Api {
        status: status.as_u16(),
        message: error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        }),
    })
}

/// Pull `error`/`detail`/`message` out of an error body, else the raw text.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "detail", "message"] {
            match v.get(key) {
                Some(serde_json::Value::String(s)) => return Some(s.clone()),
                Some(other) if !other.is_null() => return Some(other.to_string()),
                _ => {}
            }
        }
    }
    Some(body.chars().take(200).collect())
}
