//! Downloading fetch sources
//!
//! The `Fetcher` trait lets the resolver and the bundle codec download bytes
//! without caring how. `HttpFetcher` is the real implementation: blocking
//! `reqwest` for `http`/`https` and a plain file read for `file://` URLs.

use std::time::Duration;

use reqwest::blocking::Client;
use url::Url;

use crate::error::{Error, Result};

/// Default timeout for HTTP requests
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// Retrieves the bytes behind a URL.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetches over HTTP(S) and from `file://` URLs.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("ecsact-recipe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Fetch {
                url: String::new(),
                message: format!("failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = Url::parse(url)?;
        let fetch_error = |message: String| Error::Fetch {
            url: url.to_string(),
            message,
        };

        match parsed.scheme() {
            "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|_| fetch_error("not a local file path".to_string()))?;
                std::fs::read(&path).map_err(|e| fetch_error(format!("{}: {}", path.display(), e)))
            }
            "http" | "https" => {
                log::debug!("downloading {}", url);
                let response = self
                    .client
                    .get(parsed)
                    .send()
                    .map_err(|e| fetch_error(e.to_string()))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(fetch_error(format!("HTTP {}", status)));
                }
                let bytes = response.bytes().map_err(|e| fetch_error(e.to_string()))?;
                Ok(bytes.to_vec())
            }
            scheme => Err(fetch_error(format!("unsupported URL scheme '{}'", scheme))),
        }
    }
}

/// The last path segment of a URL, used as the file name of a fetched
/// download.
pub fn url_basename(url: &str) -> Result<String> {
    let parsed = Url::parse(url)?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::Fetch {
            url: url.to_string(),
            message: "URL has no file name".to_string(),
        })
}
