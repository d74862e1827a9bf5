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

//! The client protocol engine.
//!
//! [`ProtocolEngine`] owns one wallet and runs the two transactions against
//! it:
//!
//! * **Issuance**: `Idle → KeyFetchPending → KeyFetched → RequestSent →
//!   Completed`. Fetches the issuer key, sends a blinded request for `n`
//!   credits, unblinds the answer into a token.
//! * **Spend**: `Idle → Validated → ProofPrepared → RequestSent → Completed`.
//!   Proves the token is worth at least `n`, sends the proof, and turns the
//!   issuer's refund into a token for what is left.
//!
//! Either transaction can end in `Failed` instead. The wallet is written
//! once, after the last network round trip, so a failure at any phase (or
//! dropping the future while it waits on the issuer) leaves it exactly as
//! it was. In particular a rejected spend does not burn the token: the old
//! token stays valid for a retry.
//!
//! Both transactions take `&mut self`, which rules out two transactions
//! racing on the same wallet.

use std::fmt;

use tracing::{Instrument, debug, info, info_span, warn};

use crate::amount::Credits;
use crate::codec;
use crate::crypto::{CryptoEngine, PreparedSpend};
use crate::error::{FailureKind, WalletError};
use crate::secret::{IssuerPublicKey, Token};
use crate::state::ClientState;
use crate::transport::{IssuerReply, IssuerRequest, STATUS_OK, STATUS_REJECTED, Transport};

/// Phases of an issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuancePhase {
    Idle,
    KeyFetchPending,
    KeyFetched,
    RequestSent,
    Completed,
    Failed,
}

/// Phases of a spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpendPhase {
    Idle,
    Validated,
    ProofPrepared,
    RequestSent,
    Completed,
    Failed,
}

trait Phase: Copy + fmt::Debug + PartialEq {
    const TRANSACTION: &'static str;
    const IDLE: Self;
    const FAILED: Self;

    fn can_advance_to(self, next: Self) -> bool;
}

impl Phase for IssuancePhase {
    const TRANSACTION: &'static str = "issuance";
    const IDLE: Self = IssuancePhase::Idle;
    const FAILED: Self = IssuancePhase::Failed;

    fn can_advance_to(self, next: Self) -> bool {
        use IssuancePhase::*;
        match (self, next) {
            (Idle, KeyFetchPending)
            | (KeyFetchPending, KeyFetched)
            | (KeyFetched, RequestSent)
            | (RequestSent, Completed) => true,
            (Completed | Failed, _) => false,
            (_, Failed) => true,
            _ => false,
        }
    }
}

impl Phase for SpendPhase {
    const TRANSACTION: &'static str = "spend";
    const IDLE: Self = SpendPhase::Idle;
    const FAILED: Self = SpendPhase::Failed;

    fn can_advance_to(self, next: Self) -> bool {
        use SpendPhase::*;
        match (self, next) {
            (Idle, Validated)
            | (Validated, ProofPrepared)
            | (ProofPrepared, RequestSent)
            | (RequestSent, Completed) => true,
            (Completed | Failed, _) => false,
            (_, Failed) => true,
            _ => false,
        }
    }
}

/// Bookkeeping for one transaction in flight.
struct Attempt<P> {
    credits: Credits,
    phase: P,
}

impl<P: Phase> Attempt<P> {
    fn new(credits: Credits) -> Self {
        Attempt {
            credits,
            phase: P::IDLE,
        }
    }

    fn advance(&mut self, next: P) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal {} transition {:?} -> {:?}",
            P::TRANSACTION,
            self.phase,
            next
        );
        debug!(from = ?self.phase, to = ?next, "{} phase", P::TRANSACTION);
        self.phase = next;
    }

    fn fail(&mut self, err: WalletError) -> WalletError {
        warn!(
            phase = ?self.phase,
            kind = %err.kind(),
            credits = self.credits.get(),
            "{} failed: {err}",
            P::TRANSACTION
        );
        self.advance(P::FAILED);
        err
    }
}

/// Result of a completed issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuanceReceipt {
    pub credits: Credits,
    pub balance: i32,
}

/// Result of a completed spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpendReceipt {
    pub spent: Credits,
    pub balance: i32,
    /// The spend exceeded the balance the wallet had recorded and the issuer
    /// honoured it anyway.
    pub over_balance: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Request,
    Spend,
}

/// Summary of the most recent transaction, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub kind: TransactionKind,
    pub credits: Credits,
    pub success: bool,
    pub failure: Option<FailureKind>,
    pub message: String,
}

/// Drives issuance and spend transactions for a single wallet.
pub struct ProtocolEngine<C, T> {
    crypto: C,
    transport: T,
    state: ClientState,
    last_transaction: Option<TransactionRecord>,
}

impl<C, T> ProtocolEngine<C, T>
where
    C: CryptoEngine,
    T: Transport,
{
    /// A fresh, empty wallet.
    pub fn new(crypto: C, transport: T) -> Self {
        ProtocolEngine {
            crypto,
            transport,
            state: ClientState::new(),
            last_transaction: None,
        }
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn balance(&self) -> i32 {
        self.state.balance()
    }

    pub fn crypto(&self) -> &C {
        &self.crypto
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Access to the transport between transactions, e.g. to switch issuer.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn last_transaction(&self) -> Option<&TransactionRecord> {
        self.last_transaction.as_ref()
    }

    /// Whether spending `credits` would exceed the recorded balance. Such a
    /// spend is still attempted; the issuer decides.
    pub fn would_overspend(&self, credits: Credits) -> bool {
        i32::from(credits) > self.state.balance()
    }

    /// Forgets the token, the issuer key and the balance.
    pub fn restart(&mut self) {
        self.state.reset();
        self.last_transaction = None;
        info!("wallet reset");
    }

    /// Requests `amount` credits from the issuer.
    ///
    /// On success the wallet holds exactly `amount` credits: a second
    /// issuance replaces the first one's token and balance rather than adding
    /// to them.
    pub async fn issue<A>(&mut self, amount: A) -> Result<IssuanceReceipt, WalletError>
    where
        A: TryInto<Credits>,
        WalletError: From<A::Error>,
    {
        let credits = amount.try_into()?;
        let span = info_span!("issuance", credits = credits.get());
        let outcome = self.run_issuance(credits).instrument(span).await;

        let message = match &outcome {
            Ok(_) => format!("Successfully received {credits} credits."),
            Err(e) => format!("Failure to request credits: {e}."),
        };
        self.record(TransactionKind::Request, credits, &outcome, message);
        outcome
    }

    /// Spends `amount` credits.
    ///
    /// Requires a token from an earlier issuance. Spending more than the
    /// recorded balance is allowed and flagged in the receipt; the issuer is
    /// the authority on sufficiency.
    pub async fn spend<A>(&mut self, amount: A) -> Result<SpendReceipt, WalletError>
    where
        A: TryInto<Credits>,
        WalletError: From<A::Error>,
    {
        let credits = amount.try_into()?;
        let (token, public_key) = match (self.state.token(), self.state.issuer_public_key()) {
            (Some(token), Some(public_key)) => (token.clone(), public_key.clone()),
            _ => {
                warn!(credits = credits.get(), "spend attempted without a token");
                return Err(WalletError::NoValidToken);
            }
        };

        let span = info_span!("spend", credits = credits.get());
        let outcome = self
            .run_spend(credits, token, public_key)
            .instrument(span)
            .await;

        let message = match &outcome {
            Ok(_) => format!("Successfully spent {credits} credits."),
            Err(e) if e.kind() == FailureKind::IssuerRejected && self.state.balance() <= 0 => {
                format!("Transaction failed: {e}. Try to obtain more credits.")
            }
            Err(e) => format!("Transaction failed: {e}."),
        };
        self.record(TransactionKind::Spend, credits, &outcome, message);
        outcome
    }

    fn record<R>(
        &mut self,
        kind: TransactionKind,
        credits: Credits,
        outcome: &Result<R, WalletError>,
        message: String,
    ) {
        self.last_transaction = Some(TransactionRecord {
            kind,
            credits,
            success: outcome.is_ok(),
            failure: outcome.as_ref().err().map(WalletError::kind),
            message,
        });
    }

    async fn run_issuance(&mut self, credits: Credits) -> Result<IssuanceReceipt, WalletError> {
        let mut attempt = Attempt::<IssuancePhase>::new(credits);
        match self.drive_issuance(&mut attempt).await {
            Ok(receipt) => Ok(receipt),
            Err(e) => Err(attempt.fail(e)),
        }
    }

    async fn drive_issuance(
        &mut self,
        attempt: &mut Attempt<IssuancePhase>,
    ) -> Result<IssuanceReceipt, WalletError> {
        let credits = attempt.credits;

        attempt.advance(IssuancePhase::KeyFetchPending);
        let public_key = self.fetch_public_key().await?;
        attempt.advance(IssuancePhase::KeyFetched);

        let prepared = self.crypto.prepare_issuance(credits)?;
        let body = codec::frame_issuance_request(credits, &prepared.blinded_request);

        attempt.advance(IssuancePhase::RequestSent);
        let reply = self.transport.round_trip(IssuerRequest::issuance(body)).await?;
        let response = accept_reply(reply, "issuance request")?;

        let token = self
            .crypto
            .finalize_issuance(&public_key, &prepared.client_secret, &response)
            .map_err(|e| WalletError::IssuerRejected {
                operation: "issuance response",
                detail: e.to_string(),
            })?;
        ensure_token(&token, "issuance response")?;

        debug!(token = %token.fingerprint(), "issuance finalized");
        self.state.commit_issuance(credits, public_key, token);
        attempt.advance(IssuancePhase::Completed);
        info!(balance = self.state.balance(), "issuance committed");

        Ok(IssuanceReceipt {
            credits,
            balance: self.state.balance(),
        })
    }

    async fn fetch_public_key(&self) -> Result<IssuerPublicKey, WalletError> {
        let reply = self
            .transport
            .round_trip(IssuerRequest::public_key())
            .await
            .map_err(|e| WalletError::KeyUnavailable(e.to_string()))?;
        if !reply.is_success() {
            return Err(WalletError::KeyUnavailable(format!(
                "issuer answered with status {}",
                reply.status
            )));
        }
        if reply.body.is_empty() {
            return Err(WalletError::KeyUnavailable(
                "issuer sent an empty key".to_string(),
            ));
        }

        let public_key = IssuerPublicKey::new(reply.body);
        debug!(key = %public_key.fingerprint(), "fetched issuer public key");
        Ok(public_key)
    }

    async fn run_spend(
        &mut self,
        credits: Credits,
        token: Token,
        public_key: IssuerPublicKey,
    ) -> Result<SpendReceipt, WalletError> {
        let mut attempt = Attempt::<SpendPhase>::new(credits);
        match self
            .drive_spend(&mut attempt, token, public_key)
            .await
        {
            Ok(receipt) => Ok(receipt),
            Err(e) => Err(attempt.fail(e)),
        }
    }

    async fn drive_spend(
        &mut self,
        attempt: &mut Attempt<SpendPhase>,
        token: Token,
        public_key: IssuerPublicKey,
    ) -> Result<SpendReceipt, WalletError> {
        let credits = attempt.credits;

        let over_balance = self.would_overspend(credits);
        if over_balance {
            warn!(
                balance = self.state.balance(),
                "spending more credits than recorded; leaving it to the issuer"
            );
        }
        attempt.advance(SpendPhase::Validated);

        let PreparedSpend {
            spend_proof,
            spend_secret,
        } = self.crypto.prepare_spend(credits, &token)?;
        attempt.advance(SpendPhase::ProofPrepared);

        attempt.advance(SpendPhase::RequestSent);
        let reply = self
            .transport
            .round_trip(IssuerRequest::spend(spend_proof))
            .await?;
        let refund = accept_reply(reply, "spend")?;

        let new_token = self
            .crypto
            .apply_refund(&spend_secret, &refund, &public_key)
            .map_err(|e| WalletError::IssuerRejected {
                operation: "refund",
                detail: e.to_string(),
            })?;
        ensure_token(&new_token, "refund")?;

        debug!(
            old = %token.fingerprint(),
            new = %new_token.fingerprint(),
            "refund applied"
        );
        self.state.commit_spend(credits, new_token)?;
        attempt.advance(SpendPhase::Completed);
        info!(balance = self.state.balance(), over_balance, "spend committed");

        Ok(SpendReceipt {
            spent: credits,
            balance: self.state.balance(),
            over_balance,
        })
    }
}

/// Success body, or the error the status maps to.
fn accept_reply(reply: IssuerReply, operation: &'static str) -> Result<Vec<u8>, WalletError> {
    if reply.status == STATUS_OK {
        return Ok(reply.body);
    }
    let detail = match reply.detail() {
        d if d.is_empty() => "no reason given".to_string(),
        d => d,
    };
    match reply.status {
        STATUS_REJECTED => Err(WalletError::IssuerRejected { operation, detail }),
        code => Err(WalletError::IssuerError { code, detail }),
    }
}

fn ensure_token(token: &Token, operation: &'static str) -> Result<(), WalletError> {
    if token.is_empty() {
        return Err(WalletError::IssuerRejected {
            operation,
            detail: "produced an empty token".to_string(),
        });
    }
    Ok(())
}
