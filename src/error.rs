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

//! Outcome taxonomy for wallet transactions.

use std::convert::Infallible;
use std::fmt;

use thiserror::Error;

use crate::amount::AmountError;
use crate::config::UrlError;
use crate::crypto::CryptoError;
use crate::transport::TransportError;

/// Coarse classification of a failed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Bad amount or issuer URL; nothing was sent.
    InputValidation,
    /// The issuer's public key could not be fetched.
    KeyUnavailable,
    /// The issuer refused the request or proof, or answered with something
    /// that does not verify.
    IssuerRejected,
    /// The issuer answered with an unexpected status.
    IssuerError(u16),
    /// The issuer could not be reached.
    TransportFailure,
    /// Spend attempted without a token or issuer key.
    NoValidToken,
    /// Local cryptographic preparation failed.
    CryptoFailure,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InputValidation => f.write_str("input validation"),
            FailureKind::KeyUnavailable => f.write_str("key unavailable"),
            FailureKind::IssuerRejected => f.write_str("issuer rejected"),
            FailureKind::IssuerError(code) => write!(f, "issuer error {code}"),
            FailureKind::TransportFailure => f.write_str("transport failure"),
            FailureKind::NoValidToken => f.write_str("no valid token"),
            FailureKind::CryptoFailure => f.write_str("crypto failure"),
        }
    }
}

/// Why a transaction did not commit. The wallet is unchanged in every case.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error(transparent)]
    Url(#[from] UrlError),
    #[error("cannot retrieve issuer's public key: {0}")]
    KeyUnavailable(String),
    #[error("issuer rejected the {operation}: {detail}")]
    IssuerRejected {
        operation: &'static str,
        detail: String,
    },
    #[error("issuer error with code {code}: {detail}")]
    IssuerError { code: u16, detail: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("no valid credit token; request credits first")]
    NoValidToken,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl WalletError {
    pub fn kind(&self) -> FailureKind {
        match self {
            WalletError::Amount(_) | WalletError::Url(_) => FailureKind::InputValidation,
            WalletError::KeyUnavailable(_) => FailureKind::KeyUnavailable,
            WalletError::IssuerRejected { .. } => FailureKind::IssuerRejected,
            WalletError::IssuerError { code, .. } => FailureKind::IssuerError(*code),
            WalletError::Transport(_) => FailureKind::TransportFailure,
            WalletError::NoValidToken => FailureKind::NoValidToken,
            WalletError::Crypto(_) => FailureKind::CryptoFailure,
        }
    }

    /// Whether repeating the same transaction from the same wallet state is
    /// safe. Input errors and missing tokens will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::KeyUnavailable
                | FailureKind::IssuerRejected
                | FailureKind::IssuerError(_)
                | FailureKind::TransportFailure
        )
    }
}

impl From<Infallible> for WalletError {
    fn from(e: Infallible) -> Self {
        match e {}
    }
}
