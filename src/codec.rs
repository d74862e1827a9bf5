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

//! Byte layouts owned by the client.
//!
//! Two kinds of framing live here:
//!
//! * the `/request` body, which is the requested amount as a single byte
//!   followed by the blinded issuance request;
//! * the CBOR maps that bundle the client-side state of an issuance or a
//!   spend while the issuer is being asked. These never leave the client but
//!   use the same integer-keyed map style as the protocol messages.

use std::fmt;

use ciborium::value::Value;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::amount::Credits;

/// Error type for client-side framing.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("cbor decoding failed: {0}")]
    Decode(#[from] ciborium::de::Error<std::io::Error>),
    #[error("cbor encoding failed: {0}")]
    Encode(#[from] ciborium::ser::Error<std::io::Error>),
    /// Invalid CBOR structure
    #[error("invalid structure: {0}")]
    InvalidStructure(&'static str),
    #[error("request body is empty")]
    EmptyRequest,
    #[error("request amount {0} is out of range")]
    InvalidAmount(u8),
}

/// Builds the `/request` body: `amount ‖ blinded_request`.
pub fn frame_issuance_request(credits: Credits, blinded_request: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(1 + blinded_request.len());
    body.push(credits.to_wire());
    body.extend_from_slice(blinded_request);
    body
}

/// Splits a `/request` body into the amount and the blinded request.
pub fn split_issuance_request(body: &[u8]) -> Result<(Credits, &[u8]), CodecError> {
    let (&amount, rest) = body.split_first().ok_or(CodecError::EmptyRequest)?;
    let credits = Credits::new(amount).ok_or(CodecError::InvalidAmount(amount))?;
    Ok((credits, rest))
}

/// Client state for an issuance in flight.
///
/// ```text
/// IssuanceSecret = {
///     1: bstr,  ; pre-issuance state
///     2: bstr   ; the issuance request that was sent
/// }
/// ```
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct IssuanceSecret {
    pub pre_issuance: Vec<u8>,
    pub request: Vec<u8>,
}

impl fmt::Debug for IssuanceSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IssuanceSecret { .. }")
    }
}

impl IssuanceSecret {
    pub fn to_cbor(&self) -> Result<Vec<u8>, CodecError> {
        encode_pair(&self.pre_issuance, &self.request)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, CodecError> {
        let (pre_issuance, request) = decode_pair(
            bytes,
            "missing field 1 (pre-issuance)",
            "missing field 2 (request)",
        )?;
        Ok(IssuanceSecret {
            pre_issuance,
            request,
        })
    }
}

/// Client state for a spend in flight.
///
/// ```text
/// RefundSecret = {
///     1: bstr,  ; the spend proof that was sent
///     2: bstr   ; pre-refund state
/// }
/// ```
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct RefundSecret {
    pub spend_proof: Vec<u8>,
    pub pre_refund: Vec<u8>,
}

impl fmt::Debug for RefundSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefundSecret { .. }")
    }
}

impl RefundSecret {
    pub fn to_cbor(&self) -> Result<Vec<u8>, CodecError> {
        encode_pair(&self.spend_proof, &self.pre_refund)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, CodecError> {
        let (spend_proof, pre_refund) = decode_pair(
            bytes,
            "missing field 1 (spend proof)",
            "missing field 2 (pre-refund)",
        )?;
        Ok(RefundSecret {
            spend_proof,
            pre_refund,
        })
    }
}

fn encode_pair(first: &[u8], second: &[u8]) -> Result<Vec<u8>, CodecError> {
    let map = vec![
        (Value::Integer(1.into()), Value::Bytes(first.to_vec())),
        (Value::Integer(2.into()), Value::Bytes(second.to_vec())),
    ];

    let mut bytes = Vec::new();
    ciborium::into_writer(&Value::Map(map), &mut bytes)?;
    Ok(bytes)
}

fn decode_pair(
    bytes: &[u8],
    missing_first: &'static str,
    missing_second: &'static str,
) -> Result<(Vec<u8>, Vec<u8>), CodecError> {
    let value: Value = ciborium::from_reader(bytes)?;

    match value {
        Value::Map(map) => {
            let mut first = None;
            let mut second = None;

            for (k, v) in map {
                match (k, v) {
                    (Value::Integer(i), Value::Bytes(b)) if i == 1.into() => first = Some(b),
                    (Value::Integer(i), Value::Bytes(b)) if i == 2.into() => second = Some(b),
                    (Value::Integer(i), _) if i == 1.into() || i == 2.into() => {
                        return Err(CodecError::InvalidStructure("expected byte string"));
                    }
                    _ => {}
                }
            }

            Ok((
                first.ok_or(CodecError::InvalidStructure(missing_first))?,
                second.ok_or(CodecError::InvalidStructure(missing_second))?,
            ))
        }
        _ => Err(CodecError::InvalidStructure("expected CBOR map")),
    }
}
