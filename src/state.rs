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

//! The wallet record.
//!
//! `ClientState` only changes through its commit methods, each of which
//! replaces every affected field in one step. A transaction that fails before
//! reaching its commit leaves the state exactly as it was.

use crate::amount::Credits;
use crate::error::WalletError;
use crate::secret::{IssuerPublicKey, Token};

/// Credits, issuer key and token held by one client for one session.
///
/// `token` is `None` only before the first successful issuance (or after a
/// reset). A wallet that has spent down to zero still holds a token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientState {
    balance: i32,
    issuer_public_key: Option<IssuerPublicKey>,
    token: Option<Token>,
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits currently redeemable. Negative only if an issuer honoured a
    /// spend larger than the recorded balance.
    pub fn balance(&self) -> i32 {
        self.balance
    }

    pub fn issuer_public_key(&self) -> Option<&IssuerPublicKey> {
        self.issuer_public_key.as_ref()
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// True for a fresh or reset wallet.
    pub fn is_empty(&self) -> bool {
        self.balance == 0 && self.issuer_public_key.is_none() && self.token.is_none()
    }

    /// Records a completed issuance. Replaces any previous token and balance.
    pub(crate) fn commit_issuance(
        &mut self,
        credits: Credits,
        issuer_public_key: IssuerPublicKey,
        token: Token,
    ) {
        *self = ClientState {
            balance: i32::from(credits),
            issuer_public_key: Some(issuer_public_key),
            token: Some(token),
        };
    }

    /// Records a completed spend. Fails without changing anything if no
    /// token is held. The balance bottoms out at `i32::MIN`.
    pub(crate) fn commit_spend(&mut self, credits: Credits, token: Token) -> Result<(), WalletError> {
        if self.token.is_none() {
            return Err(WalletError::NoValidToken);
        }
        self.balance = self.balance.saturating_sub(i32::from(credits));
        self.token = Some(token);
        Ok(())
    }

    /// Back to the empty wallet.
    pub fn reset(&mut self) {
        *self = ClientState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credits(n: u8) -> Credits {
        Credits::new(n).unwrap()
    }

    fn key() -> IssuerPublicKey {
        IssuerPublicKey::new(b"issuer".to_vec())
    }

    #[test]
    fn starts_empty() {
        let state = ClientState::new();
        assert!(state.is_empty());
        assert_eq!(state.balance(), 0);
        assert!(state.token().is_none());
        assert!(state.issuer_public_key().is_none());
    }

    #[test]
    fn reissuance_overwrites() {
        let mut state = ClientState::new();
        state.commit_issuance(credits(10), key(), Token::new(vec![1]));
        state.commit_issuance(credits(3), key(), Token::new(vec![2]));
        assert_eq!(state.balance(), 3);
        assert_eq!(state.token(), Some(&Token::new(vec![2])));
    }

    #[test]
    fn spend_requires_token() {
        let mut state = ClientState::new();
        let before = state.clone();
        assert!(matches!(
            state.commit_spend(credits(1), Token::new(vec![1])),
            Err(WalletError::NoValidToken)
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn spend_to_zero_keeps_token() {
        let mut state = ClientState::new();
        state.commit_issuance(credits(4), key(), Token::new(vec![1]));
        state.commit_spend(credits(4), Token::new(vec![2])).unwrap();
        assert_eq!(state.balance(), 0);
        assert!(state.has_token());
        assert!(!state.is_empty());
    }

    #[test]
    fn over_spend_goes_negative() {
        let mut state = ClientState::new();
        state.commit_issuance(credits(2), key(), Token::new(vec![1]));
        state.commit_spend(credits(5), Token::new(vec![2])).unwrap();
        assert_eq!(state.balance(), -3);
    }

    #[test]
    fn over_spend_saturates_at_the_floor() {
        let mut state = ClientState {
            balance: i32::MIN + 1,
            issuer_public_key: Some(key()),
            token: Some(Token::new(vec![1])),
        };
        state.commit_spend(credits(255), Token::new(vec![2])).unwrap();
        assert_eq!(state.balance(), i32::MIN);
        state.commit_spend(credits(1), Token::new(vec![3])).unwrap();
        assert_eq!(state.balance(), i32::MIN);
    }

    #[test]
    fn reset_clears_everything() {
        let mut state = ClientState::new();
        state.commit_issuance(credits(9), key(), Token::new(vec![1]));
        state.reset();
        assert!(state.is_empty());
        assert_eq!(state, ClientState::new());
    }
}
