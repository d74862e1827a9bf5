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

//! # Anonymous Credit Tokens: client wallet
//!
//! This crate is the client side of Anonymous Credit Tokens (ACT), an online
//! variant of e-cash. A client obtains a batch of credits from an issuer and
//! later spends part of them. The issuer cannot link a spend to the issuance
//! that funded it, nor two spends to each other.
//!
//! ## Protocol Overview
//!
//! 1. **Issuance**: the client fetches the issuer's public key, sends a
//!    blinded request for `n` credits and unblinds the answer into a token.
//! 2. **Spending**: the client proves its token is worth at least `s`
//!    credits without revealing it. The issuer answers with a refund, which
//!    the client turns into a fresh token for the remaining `n - s` credits.
//!
//! ## Structure
//!
//! * [`ProtocolEngine`] runs both transactions against one [`ClientState`].
//! * [`CryptoEngine`] is the cryptography it drives. [`ActEngine`] (feature
//!   `act`) implements it with the `anonymous-credit-tokens` crate.
//! * [`Transport`] carries bytes to the issuer. [`HttpTransport`] (feature
//!   `http`) talks to a real issuer; [`LocalIssuer`] (feature `act`) is an
//!   issuer in process.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use act_wallet::{ActEngine, HttpConfig, HttpTransport, IssuerUrl, ProtocolEngine};
//!
//! # async fn demo() -> Result<(), act_wallet::WalletError> {
//! let issuer = IssuerUrl::from_input("http://localhost:8787")?;
//! let transport = HttpTransport::new(HttpConfig::new(issuer))?;
//! let mut wallet = ProtocolEngine::new(ActEngine::default(), transport);
//!
//! wallet.issue(10u8).await?;
//! let receipt = wallet.spend(4u8).await?;
//! assert_eq!(receipt.balance, 6);
//! # Ok(())
//! # }
//! ```
//!
//! The wallet lives in memory only. Nothing about it survives a restart,
//! which keeps separate sessions unlinkable.

pub mod amount;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod secret;
pub mod state;
pub mod transport;

#[cfg(feature = "act")]
pub mod act;
#[cfg(feature = "http")]
pub mod http;


pub use amount::{AmountError, Credits, MAX_CREDITS};
pub use config::{DEFAULT_ISSUER, HttpConfig, IssuerUrl, UrlError};
pub use crypto::{CryptoEngine, CryptoError, PreparedIssuance, PreparedSpend};
pub use engine::{
    IssuancePhase, IssuanceReceipt, ProtocolEngine, SpendPhase, SpendReceipt, TransactionKind,
    TransactionRecord,
};
pub use error::{FailureKind, WalletError};
pub use secret::{ClientSecret, IssuerPublicKey, SpendSecret, Token};
pub use state::ClientState;
pub use transport::{Endpoint, IssuerReply, IssuerRequest, Transport, TransportError};

#[cfg(feature = "act")]
pub use act::{ActEngine, ActParams, LocalIssuer};
#[cfg(feature = "http")]
pub use http::HttpTransport;
