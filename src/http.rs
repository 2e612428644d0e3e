use anyhow::{anyhow, bail, Context, Result};
use reqwest::{Client, Response, StatusCode, Url};
use std::time::Duration;

pub const USER_AGENT: &str = "classroom-zip/0.1";

/// Build the shared HTTP client used by the remote service clients.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .context("failed to build reqwest client")
}

/// Append `segments` to the path of `base`, percent-encoding each one.
///
/// Ids coming from callers go through here so that `/`, `?` or `#` inside
/// an id stay part of that one segment. Dot segments are refused.
pub fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    if let Some(bad) = segments
        .iter()
        .find(|s| s.is_empty() || **s == "." || **s == "..")
    {
        bail!("invalid path segment {:?}", bad);
    }
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| anyhow!("base URL {} cannot carry a path", base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Turn a non-2xx response into an error carrying status and body text.
pub async fn ensure_success(res: Response, service: &str) -> Result<Response> {
    if res.status() == StatusCode::TOO_MANY_REQUESTS {
        let body = res.text().await.unwrap_or_default();
        return Err(anyhow!("received 429 from {}: {}", service, body));
    }
    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        return Err(anyhow!("{} error {}: {}", service, status, body));
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_escapes_reserved_characters() {
        let base = Url::parse("https://example.com/").unwrap();
        let url = endpoint(&base, &["files", "a/b?c#d"]).unwrap();
        assert_eq!(url.path(), "/files/a%2Fb%3Fc%23d");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let base = Url::parse("http://127.0.0.1:9000/proxy/").unwrap();
        let url = endpoint(&base, &["v1", "courses"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/proxy/v1/courses");
    }

    #[test]
    fn endpoint_rejects_dot_segments() {
        let base = Url::parse("https://example.com/").unwrap();
        assert!(endpoint(&base, &["files", ".."]).is_err());
        assert!(endpoint(&base, &["files", ""]).is_err());
    }
}
