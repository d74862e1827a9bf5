// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Issuer location and transport settings.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::transport::Endpoint;

/// The public demo issuer.
pub const DEFAULT_ISSUER: &str = "https://act-issuer-demo.cloudflareresearch.com/";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("invalid issuer URL: {0}")]
    Parse(#[from] url::ParseError),
    #[error("issuer URL must use http:// or https://, not {0}://")]
    Scheme(String),
}

/// Base URL of an issuer. Always `http` or `https`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerUrl(Url);

impl IssuerUrl {
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        let url = Url::parse(input)?;
        match url.scheme() {
            "http" | "https" => Ok(IssuerUrl(url)),
            other => Err(UrlError::Scheme(other.to_string())),
        }
    }

    /// Like [`IssuerUrl::parse`], but blank input selects [`DEFAULT_ISSUER`].
    pub fn from_input(input: &str) -> Result<Self, UrlError> {
        match input.trim() {
            "" => Ok(IssuerUrl::default()),
            trimmed => Self::parse(trimmed),
        }
    }

    /// Full URL of `endpoint`. Endpoint paths are absolute, so they replace
    /// any path on the base URL.
    pub fn endpoint(&self, endpoint: Endpoint) -> Result<Url, UrlError> {
        Ok(self.0.join(endpoint.path())?)
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl Default for IssuerUrl {
    fn default() -> Self {
        IssuerUrl(Url::parse(DEFAULT_ISSUER).expect("default issuer URL is valid"))
    }
}

impl FromStr for IssuerUrl {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_input(s)
    }
}

impl fmt::Display for IssuerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Settings for [`HttpTransport`](crate::HttpTransport).
#[derive(Debug, Clone, Default)]
pub struct HttpConfig {
    pub issuer: IssuerUrl,
    /// Per-request timeout. `None` waits for as long as the connection lives.
    pub timeout: Option<Duration>,
}

impl HttpConfig {
    pub fn new(issuer: IssuerUrl) -> Self {
        HttpConfig {
            issuer,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_selects_default_issuer() {
        assert_eq!(IssuerUrl::from_input("  ").unwrap(), IssuerUrl::default());
        assert_eq!(IssuerUrl::default().to_string(), DEFAULT_ISSUER);
    }

    #[test]
    fn only_http_schemes_are_accepted() {
        assert!(IssuerUrl::parse("http://localhost:8787").is_ok());
        assert!(IssuerUrl::parse("https://issuer.example").is_ok());
        assert_eq!(
            IssuerUrl::parse("ftp://issuer.example"),
            Err(UrlError::Scheme("ftp".to_string()))
        );
        assert!(matches!(
            IssuerUrl::parse("not a url"),
            Err(UrlError::Parse(_))
        ));
    }

    #[test]
    fn endpoint_paths_replace_base_path() {
        let issuer: IssuerUrl = "http://localhost:8787/some/base/".parse().unwrap();
        assert_eq!(
            issuer.endpoint(Endpoint::PublicKey).unwrap().as_str(),
            "http://localhost:8787/public"
        );
        assert_eq!(
            IssuerUrl::default()
                .endpoint(Endpoint::Spend)
                .unwrap()
                .as_str(),
            "https://act-issuer-demo.cloudflareresearch.com/spend"
        );
    }
}
