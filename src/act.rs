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

//! Anonymous Credit Tokens as a [`CryptoEngine`].
//!
//! [`ActEngine`] plugs the `anonymous-credit-tokens` primitives into the
//! protocol engine. All blobs it produces or accepts are the CBOR encodings
//! defined by that crate; the two client secrets are CBOR maps from
//! [`codec`](crate::codec) that bundle the pieces needed to finish the
//! transaction.
//!
//! [`LocalIssuer`] is the issuer half, answering the three issuer endpoints
//! in process. It exists for tests, benchmarks and offline demos.

use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;

use anonymous_credit_tokens::{
    CreditToken, ErrorCode, IssuanceRequest, IssuanceResponse, Params, PreIssuance, PreRefund,
    PrivateKey, PublicKey, Refund, Scalar, SpendProof,
};
use async_trait::async_trait;
use rand_core::OsRng;
use tracing::{debug, warn};

use crate::amount::Credits;
use crate::codec::{IssuanceSecret, RefundSecret, split_issuance_request};
use crate::crypto::{CryptoEngine, CryptoError, PreparedIssuance, PreparedSpend};
use crate::secret::{ClientSecret, IssuerPublicKey, SpendSecret, Token};
use crate::transport::{
    Endpoint, IssuerReply, IssuerRequest, STATUS_REJECTED, Transport, TransportError,
};

/// Bit length of the range proofs. A balance never exceeds one byte.
pub const CREDIT_BITS: usize = 8;

/// Spend proof over [`CREDIT_BITS`]-bit amounts.
pub type CreditSpendProof = SpendProof<CREDIT_BITS>;

/// Request context bound into every token. Shared by all clients so that it
/// reveals nothing about who spends.
const REQUEST_CONTEXT: Scalar = Scalar::ZERO;

/// Context labels that bind every proof to one deployment.
///
/// Client and issuer must agree on all four.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActParams {
    pub organization: String,
    pub service: String,
    pub deployment: String,
    pub version: String,
}

impl ActParams {
    pub fn new(
        organization: impl Into<String>,
        service: impl Into<String>,
        deployment: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        ActParams {
            organization: organization.into(),
            service: service.into(),
            deployment: deployment.into(),
            version: version.into(),
        }
    }

    fn to_params(&self) -> Params {
        Params::new(
            &self.organization,
            &self.service,
            &self.deployment,
            &self.version,
        )
    }
}

/// The labels used by the public demo issuer.
impl Default for ActParams {
    fn default() -> Self {
        ActParams::new("example-org", "payment-api", "production", "2024-01-15")
    }
}

fn malformed<E: fmt::Display>(what: &'static str) -> impl FnOnce(E) -> CryptoError {
    move |e| CryptoError::malformed(what, e)
}

fn rejected(what: &'static str) -> impl FnOnce(ErrorCode) -> CryptoError {
    move |code| {
        debug!(%code, "{what} failed verification");
        CryptoError::Verification(what)
    }
}

/// [`CryptoEngine`] backed by `anonymous-credit-tokens`.
pub struct ActEngine {
    labels: ActParams,
    params: Params,
}

impl ActEngine {
    pub fn new(labels: ActParams) -> Self {
        let params = labels.to_params();
        ActEngine { labels, params }
    }

    pub fn labels(&self) -> &ActParams {
        &self.labels
    }
}

impl Default for ActEngine {
    fn default() -> Self {
        ActEngine::new(ActParams::default())
    }
}

impl fmt::Debug for ActEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActEngine")
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

impl CryptoEngine for ActEngine {
    /// The amount is not part of the blinded request; it travels in the
    /// framing byte in front of it.
    fn prepare_issuance(&self, _credits: Credits) -> Result<PreparedIssuance, CryptoError> {
        let pre_issuance = PreIssuance::random(OsRng);
        let request = pre_issuance.request(&self.params, OsRng);
        let blinded_request = request.to_cbor().map_err(malformed("issuance request"))?;

        let secret = IssuanceSecret {
            pre_issuance: pre_issuance.to_cbor().map_err(malformed("pre-issuance"))?,
            request: blinded_request.clone(),
        };
        Ok(PreparedIssuance {
            blinded_request,
            client_secret: ClientSecret::new(secret.to_cbor()?),
        })
    }

    fn finalize_issuance(
        &self,
        public_key: &IssuerPublicKey,
        client_secret: &ClientSecret,
        response: &[u8],
    ) -> Result<Token, CryptoError> {
        let secret = IssuanceSecret::from_cbor(client_secret.as_bytes())?;
        let pre_issuance =
            PreIssuance::from_cbor(&secret.pre_issuance).map_err(malformed("pre-issuance"))?;
        let request =
            IssuanceRequest::from_cbor(&secret.request).map_err(malformed("issuance request"))?;
        let public_key =
            PublicKey::from_cbor(public_key.as_bytes()).map_err(malformed("issuer public key"))?;
        let response =
            IssuanceResponse::from_cbor(response).map_err(malformed("issuance response"))?;

        let credit_token = pre_issuance
            .to_credit_token::<CREDIT_BITS>(&self.params, &public_key, &request, &response)
            .map_err(rejected("issuance response"))?;
        let bytes = credit_token.to_cbor().map_err(malformed("credit token"))?;
        Ok(Token::new(bytes))
    }

    /// Fails with [`CryptoError::Insufficient`] when the token holds fewer
    /// than `credits`: no proof exists for such a spend.
    fn prepare_spend(&self, credits: Credits, token: &Token) -> Result<PreparedSpend, CryptoError> {
        let credit_token =
            CreditToken::from_cbor(token.as_bytes()).map_err(malformed("credit token"))?;
        let (spend_proof, pre_refund) = credit_token
            .prove_spend::<CREDIT_BITS>(&self.params, Scalar::from(credits.get()), OsRng)
            .map_err(|code| match code {
                ErrorCode::InvalidAmount => CryptoError::Insufficient(credits),
                code => rejected("credit token")(code),
            })?;

        let secret = RefundSecret {
            spend_proof: spend_proof.to_cbor().map_err(malformed("spend proof"))?,
            pre_refund: pre_refund.to_cbor().map_err(malformed("pre-refund"))?,
        };
        Ok(PreparedSpend {
            spend_proof: secret.spend_proof.clone(),
            spend_secret: SpendSecret::new(secret.to_cbor()?),
        })
    }

    fn apply_refund(
        &self,
        spend_secret: &SpendSecret,
        refund: &[u8],
        public_key: &IssuerPublicKey,
    ) -> Result<Token, CryptoError> {
        let secret = RefundSecret::from_cbor(spend_secret.as_bytes())?;
        let spend_proof = CreditSpendProof::from_cbor(&secret.spend_proof)
            .map_err(malformed("spend proof"))?;
        let pre_refund = PreRefund::from_cbor(&secret.pre_refund).map_err(malformed("pre-refund"))?;
        let refund = Refund::from_cbor(refund).map_err(malformed("refund"))?;
        let public_key =
            PublicKey::from_cbor(public_key.as_bytes()).map_err(malformed("issuer public key"))?;

        let credit_token = pre_refund
            .to_credit_token(&self.params, &spend_proof, &refund, &public_key)
            .map_err(rejected("refund"))?;
        let bytes = credit_token.to_cbor().map_err(malformed("credit token"))?;
        Ok(Token::new(bytes))
    }
}

/// An issuer that answers `/public`, `/request` and `/spend` in process.
///
/// Remembers the nullifier of every honoured spend and refuses to honour it
/// twice. A refused spend does not consume its nullifier, so the client can
/// retry with the same token.
pub struct LocalIssuer {
    private_key: PrivateKey,
    params: Params,
    spent: Mutex<HashSet<Scalar>>,
}

impl LocalIssuer {
    /// A fresh issuer with a random key.
    pub fn new(labels: &ActParams) -> Self {
        LocalIssuer {
            private_key: PrivateKey::random(OsRng),
            params: labels.to_params(),
            spent: Mutex::new(HashSet::new()),
        }
    }

    /// Number of spends honoured so far.
    pub fn spend_count(&self) -> Result<usize, TransportError> {
        Ok(self.nullifiers()?.len())
    }

    fn nullifiers(&self) -> Result<std::sync::MutexGuard<'_, HashSet<Scalar>>, TransportError> {
        self.spent
            .lock()
            .map_err(|_| TransportError::Other("issuer state poisoned".to_string()))
    }

    fn serve_public_key(&self) -> IssuerReply {
        match self.private_key.public().to_cbor() {
            Ok(bytes) => IssuerReply::ok(bytes),
            Err(e) => IssuerReply::new(500, format!("err: cannot encode public key: {e}")),
        }
    }

    fn serve_request(&self, body: &[u8]) -> IssuerReply {
        let (credits, request) = match split_issuance_request(body) {
            Ok(parts) => parts,
            Err(e) => return IssuerReply::new(STATUS_REJECTED, format!("err: {e}")),
        };
        let request = match IssuanceRequest::from_cbor(request) {
            Ok(request) => request,
            Err(e) => return IssuerReply::new(STATUS_REJECTED, format!("err: bad request: {e}")),
        };
        let response = match self.private_key.issue::<CREDIT_BITS>(
            &self.params,
            &request,
            Scalar::from(credits.get()),
            REQUEST_CONTEXT,
            OsRng,
        ) {
            Ok(response) => response,
            Err(code) => return IssuerReply::new(STATUS_REJECTED, format!("err: {code}")),
        };
        match response.to_cbor() {
            Ok(bytes) => IssuerReply::ok(bytes),
            Err(e) => IssuerReply::new(500, format!("err: cannot encode response: {e}")),
        }
    }

    fn serve_spend(&self, body: &[u8]) -> Result<IssuerReply, TransportError> {
        let spend_proof = match CreditSpendProof::from_cbor(body) {
            Ok(proof) => proof,
            Err(e) => {
                return Ok(IssuerReply::new(
                    STATUS_REJECTED,
                    format!("err: bad proof: {e}"),
                ));
            }
        };

        let mut spent = self.nullifiers()?;
        let nullifier = spend_proof.nullifier();
        if spent.contains(&nullifier) {
            warn!("double spend refused");
            return Ok(IssuerReply::new(
                STATUS_REJECTED,
                "err: Double-spending attempt detected",
            ));
        }

        let refund = match self
            .private_key
            .refund(&self.params, &spend_proof, Scalar::ZERO, OsRng)
        {
            Ok(refund) => refund,
            Err(code) => {
                return Ok(IssuerReply::new(
                    STATUS_REJECTED,
                    format!("err: spend proof refused: {code}"),
                ));
            }
        };
        let bytes = match refund.to_cbor() {
            Ok(bytes) => bytes,
            Err(e) => return Ok(IssuerReply::new(500, format!("err: {e}"))),
        };
        spent.insert(nullifier);
        Ok(IssuerReply::ok(bytes))
    }
}

impl fmt::Debug for LocalIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalIssuer").finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for LocalIssuer {
    async fn round_trip(&self, request: IssuerRequest) -> Result<IssuerReply, TransportError> {
        let reply = match request.endpoint {
            Endpoint::PublicKey => self.serve_public_key(),
            Endpoint::Request => self.serve_request(&request.body),
            Endpoint::Spend => self.serve_spend(&request.body)?,
        };
        debug!(endpoint = %request.endpoint, status = reply.status, "local issuer replied");
        Ok(reply)
    }
}
