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

//! Opaque byte blobs that cross the [`CryptoEngine`](crate::CryptoEngine)
//! boundary.
//!
//! The engine never looks inside these values. Anything that could link a
//! spend back to an issuance (tokens, client secrets, spend secrets) is wiped
//! from memory on drop and never printed; `Debug` shows at most a short
//! BLAKE3 fingerprint.

use std::fmt;

use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop};

const FINGERPRINT_LEN: usize = 8;

fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(&blake3::hash(bytes).as_bytes()[..FINGERPRINT_LEN])
}

/// The issuer's public parameters for one key epoch, as served by `/public`.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuerPublicKey(Vec<u8>);

impl IssuerPublicKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        IssuerPublicKey(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.0)
    }
}

impl fmt::Debug for IssuerPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IssuerPublicKey({})", self.fingerprint())
    }
}

/// An unlinkable proof of the wallet's remaining value.
///
/// Equality is constant-time.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Token(Vec<u8>);

impl Token {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Token(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short identifier for logs. Only meaningful on this client.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.0)
    }
}

impl ConstantTimeEq for Token {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0.as_slice().ct_eq(other.0.as_slice())
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for Token {}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.fingerprint())
    }
}

/// State retained between sending an issuance request and unblinding the
/// issuer's response.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClientSecret(Vec<u8>);

impl ClientSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        ClientSecret(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientSecret(..)")
    }
}

/// State retained between sending a spend proof and applying the refund.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SpendSecret(Vec<u8>);

impl SpendSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        SpendSecret(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SpendSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SpendSecret(..)")
    }
}
