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

//! Validated credit amounts.
//!
//! Every amount that enters a protocol message is a [`Credits`] value, so the
//! `1..=255` range is checked once, before any network or cryptographic work
//! happens. The upper bound comes from the wire format: the issuance request
//! carries the amount in a single byte.

use std::fmt;
use std::num::NonZeroU8;
use std::str::FromStr;

use thiserror::Error;

/// Largest number of credits a single issuance or spend may carry.
pub const MAX_CREDITS: u8 = u8::MAX;

/// Why an amount could not be turned into [`Credits`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("please enter an amount")]
    Empty,
    #[error("`{0}` is not an integer")]
    NotInteger(String),
    #[error("{0} is outside the accepted range 1..=255")]
    OutOfRange(i128),
}

/// A credit amount in `1..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Credits(NonZeroU8);

impl Credits {
    pub const ONE: Credits = Credits(NonZeroU8::MIN);
    pub const MAX: Credits = Credits(NonZeroU8::MAX);

    pub fn new(value: u8) -> Option<Self> {
        NonZeroU8::new(value).map(Credits)
    }

    pub fn get(self) -> u8 {
        self.0.get()
    }

    /// The single byte that prefixes an issuance request on the wire.
    pub fn to_wire(self) -> u8 {
        self.get()
    }

    fn from_wide(value: i128) -> Result<Self, AmountError> {
        u8::try_from(value)
            .ok()
            .and_then(Credits::new)
            .ok_or(AmountError::OutOfRange(value))
    }
}

impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<Credits> for u8 {
    fn from(credits: Credits) -> u8 {
        credits.get()
    }
}

impl From<Credits> for i32 {
    fn from(credits: Credits) -> i32 {
        i32::from(credits.get())
    }
}

impl From<NonZeroU8> for Credits {
    fn from(value: NonZeroU8) -> Self {
        Credits(value)
    }
}

macro_rules! credits_from_int {
    ($($t:ty),*) => {
        $(
            impl TryFrom<$t> for Credits {
                type Error = AmountError;

                fn try_from(value: $t) -> Result<Self, Self::Error> {
                    Credits::from_wide(value as i128)
                }
            }
        )*
    };
}

credits_from_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl TryFrom<f64> for Credits {
    type Error = AmountError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(AmountError::NotInteger(value.to_string()));
        }
        // Finite and integral; anything beyond i128 is out of range anyway.
        if value.abs() > 1e30 {
            return Err(AmountError::OutOfRange(i128::MAX));
        }
        Credits::from_wide(value as i128)
    }
}

impl FromStr for Credits {
    type Err = AmountError;

    /// Accepts decimal integers with optional surrounding whitespace.
    /// `"3.0"` is accepted as 3, `"3.5"` is rejected as non-integral.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }
        if let Ok(value) = s.parse::<i128>() {
            return Credits::from_wide(value);
        }
        match s.parse::<f64>() {
            Ok(value) => Credits::try_from(value).map_err(|e| match e {
                AmountError::NotInteger(_) => AmountError::NotInteger(s.to_string()),
                other => other,
            }),
            Err(_) => Err(AmountError::NotInteger(s.to_string())),
        }
    }
}

impl TryFrom<&str> for Credits {
    type Error = AmountError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<&String> for Credits {
    type Error = AmountError;

    fn try_from(value: &String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
