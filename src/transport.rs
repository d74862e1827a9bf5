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

//! Round trips to the issuer.
//!
//! The issuer exposes three endpoints. A [`Transport`] moves bytes to one of
//! them and hands back the status code and body untouched; interpreting the
//! status is the engine's job.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// HTTP status the issuer answers with on success.
pub const STATUS_OK: u16 = 200;
/// HTTP status the issuer answers with when it refuses a request or proof.
pub const STATUS_REJECTED: u16 = 400;

/// Issuer endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `GET /public`: the issuer's public key.
    PublicKey,
    /// `POST /request`: amount byte followed by a blinded issuance request.
    Request,
    /// `POST /spend`: a spend proof; answered with a refund.
    Spend,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::PublicKey => "/public",
            Endpoint::Request => "/request",
            Endpoint::Spend => "/spend",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Endpoint::PublicKey => Method::Get,
            Endpoint::Request | Endpoint::Spend => Method::Post,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
        })
    }
}

/// One request to the issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerRequest {
    pub endpoint: Endpoint,
    pub body: Vec<u8>,
}

impl IssuerRequest {
    pub fn public_key() -> Self {
        IssuerRequest {
            endpoint: Endpoint::PublicKey,
            body: Vec::new(),
        }
    }

    pub fn issuance(body: Vec<u8>) -> Self {
        IssuerRequest {
            endpoint: Endpoint::Request,
            body,
        }
    }

    pub fn spend(body: Vec<u8>) -> Self {
        IssuerRequest {
            endpoint: Endpoint::Spend,
            body,
        }
    }
}

/// Raw issuer answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl IssuerReply {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        IssuerReply {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(STATUS_OK, body)
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }

    /// The body as text, for error messages. Trimmed and capped.
    pub fn detail(&self) -> String {
        const MAX_DETAIL: usize = 256;
        let text = String::from_utf8_lossy(&self.body);
        let text = text.trim();
        match text.char_indices().nth(MAX_DETAIL) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.to_string(),
        }
    }
}

/// Network-level failure: the issuer's answer never arrived.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("could not reach issuer: {0}")]
    Unreachable(String),
    #[error("failed to read issuer response: {0}")]
    Body(String),
    #[error("transport error: {0}")]
    Other(String),
}

/// Exchanges bytes with the issuer.
///
/// Implementations must not retry on their own: an issuance request that
/// reached the issuer is not idempotent.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn round_trip(&self, request: IssuerRequest) -> Result<IssuerReply, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn round_trip(&self, request: IssuerRequest) -> Result<IssuerReply, TransportError> {
        (**self).round_trip(request).await
    }
}
