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

//! [`Transport`] over HTTP(S) with `reqwest`.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use crate::config::{HttpConfig, IssuerUrl};
use crate::transport::{IssuerReply, IssuerRequest, Method, Transport, TransportError};

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: Client,
    issuer: IssuerUrl,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        debug!(issuer = %config.issuer, timeout = ?config.timeout, "creating http transport");
        let mut builder = reqwest::ClientBuilder::new();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| TransportError::Other(format!("failed to create http client: {e}")))?;
        Ok(HttpTransport {
            http_client,
            issuer: config.issuer,
        })
    }

    pub fn issuer(&self) -> &IssuerUrl {
        &self.issuer
    }

    /// Points later round trips at another issuer. Does not touch requests
    /// already in flight.
    pub fn set_issuer(&mut self, issuer: IssuerUrl) {
        self.issuer = issuer;
    }
}

fn map_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() || e.is_request() {
        TransportError::Unreachable(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn round_trip(&self, request: IssuerRequest) -> Result<IssuerReply, TransportError> {
        let url = self
            .issuer
            .endpoint(request.endpoint)
            .map_err(|e| TransportError::Other(e.to_string()))?;

        let builder = match request.endpoint.method() {
            Method::Get => self.http_client.get(url),
            Method::Post => self.http_client.post(url).body(request.body),
        };

        let res = builder.send().await.map_err(|e| {
            error!(endpoint = %request.endpoint, "issuer request failed: {e}");
            map_send_error(e)
        })?;
        let status = res.status().as_u16();
        let body = res.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Body(e.to_string())
            }
        })?;

        debug!(endpoint = %request.endpoint, status, len = body.len(), "issuer replied");
        Ok(IssuerReply::new(status, body.to_vec()))
    }
}
