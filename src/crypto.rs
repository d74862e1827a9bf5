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

//! The cryptographic capability the protocol engine drives.
//!
//! The engine only sequences these calls and moves their outputs between the
//! wallet and the issuer. What the bytes mean is an agreement between a
//! [`CryptoEngine`] implementation and the issuer it talks to.

use thiserror::Error;

use crate::amount::Credits;
use crate::codec::CodecError;
use crate::secret::{ClientSecret, IssuerPublicKey, SpendSecret, Token};

/// Failure inside a [`CryptoEngine`].
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A blob produced earlier on this client could not be read back.
    #[error("malformed {what}: {detail}")]
    Malformed { what: &'static str, detail: String },
    /// Issuer material failed verification.
    #[error("verification of the {0} failed")]
    Verification(&'static str),
    /// The token holds fewer credits than the spend asks for.
    #[error("token cannot cover a spend of {0} credits")]
    Insufficient(Credits),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl CryptoError {
    pub fn malformed(what: &'static str, detail: impl ToString) -> Self {
        CryptoError::Malformed {
            what,
            detail: detail.to_string(),
        }
    }
}

/// Output of [`CryptoEngine::prepare_issuance`].
#[derive(Debug)]
pub struct PreparedIssuance {
    /// Sent to the issuer after the amount byte.
    pub blinded_request: Vec<u8>,
    /// Kept locally until the issuer answers.
    pub client_secret: ClientSecret,
}

/// Output of [`CryptoEngine::prepare_spend`].
#[derive(Debug)]
pub struct PreparedSpend {
    /// Sent to the issuer as the whole `/spend` body.
    pub spend_proof: Vec<u8>,
    /// Kept locally until the refund arrives.
    pub spend_secret: SpendSecret,
}

/// Blind issuance and spend-with-refund primitives.
///
/// Implementations must not block and must not keep state between calls
/// beyond their own configuration; the only side effect allowed is drawing
/// from a secure randomness source.
pub trait CryptoEngine {
    /// Builds a blinded request for `credits` new credits.
    fn prepare_issuance(&self, credits: Credits) -> Result<PreparedIssuance, CryptoError>;

    /// Unblinds the issuer's response into a token.
    fn finalize_issuance(
        &self,
        public_key: &IssuerPublicKey,
        client_secret: &ClientSecret,
        response: &[u8],
    ) -> Result<Token, CryptoError>;

    /// Proves possession of at least `credits` in `token`.
    fn prepare_spend(&self, credits: Credits, token: &Token) -> Result<PreparedSpend, CryptoError>;

    /// Turns the issuer's refund into a token for the remaining value.
    fn apply_refund(
        &self,
        spend_secret: &SpendSecret,
        refund: &[u8],
        public_key: &IssuerPublicKey,
    ) -> Result<Token, CryptoError>;
}

impl<C: CryptoEngine + ?Sized> CryptoEngine for &C {
    fn prepare_issuance(&self, credits: Credits) -> Result<PreparedIssuance, CryptoError> {
        (**self).prepare_issuance(credits)
    }

    fn finalize_issuance(
        &self,
        public_key: &IssuerPublicKey,
        client_secret: &ClientSecret,
        response: &[u8],
    ) -> Result<Token, CryptoError> {
        (**self).finalize_issuance(public_key, client_secret, response)
    }

    fn prepare_spend(&self, credits: Credits, token: &Token) -> Result<PreparedSpend, CryptoError> {
        (**self).prepare_spend(credits, token)
    }

    fn apply_refund(
        &self,
        spend_secret: &SpendSecret,
        refund: &[u8],
        public_key: &IssuerPublicKey,
    ) -> Result<Token, CryptoError> {
        (**self).apply_refund(spend_secret, refund, public_key)
    }
}
