//! Fixed-point monetary/quantity type.
//!
//! All prices, quantities, balances, and fees in the kernel are [`Amount`] —
//! a signed 128-bit integer scaled by [`SCALE`] (10^8). Unlike the teacher's
//! `f64`-round-trip `to_amount`/`from_amount` helpers, every operation here is
//! exact integer arithmetic; nothing passes through a float.

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional decimal digits an [`Amount`] carries.
pub const DECIMALS: u32 = 8;
/// `10^DECIMALS`, the conversion factor between an integer unit and an [`Amount`].
pub const SCALE: i128 = 100_000_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("'{0}' is not a valid amount")]
    Malformed(String),
    #[error("'{0}' has more than {DECIMALS} fractional digits")]
    TooManyDecimals(String),
}

/// A signed fixed-point number with exactly 8 fractional decimal digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(i128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Build an `Amount` from a raw scaled integer (i.e. `value * SCALE` already applied).
    pub const fn from_scaled(raw: i128) -> Self {
        Amount(raw)
    }

    /// The raw scaled integer backing this amount.
    pub const fn raw(self) -> i128 {
        self.0
    }

    /// Parse a decimal string such as `"100.50"` or `"-3"`. Rejects more than
    /// [`DECIMALS`] fractional digits or any non-numeric content.
    pub fn parse(s: &str) -> Result<Self, AmountError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountError::Malformed(s.to_string()));
        }
        let (neg, rest) = match s.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return Err(AmountError::Malformed(s.to_string()));
        }
        let mut parts = rest.splitn(2, '.');
        let int_part = parts.next().unwrap_or("");
        let frac_part = parts.next().unwrap_or("");
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(AmountError::Malformed(s.to_string()));
        }
        if frac_part.len() > DECIMALS as usize {
            return Err(AmountError::TooManyDecimals(s.to_string()));
        }
        let int_val: i128 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| AmountError::Malformed(s.to_string()))?
        };
        let mut frac_val: i128 = if frac_part.is_empty() {
            0
        } else {
            frac_part
                .parse()
                .map_err(|_| AmountError::Malformed(s.to_string()))?
        };
        for _ in 0..(DECIMALS as usize - frac_part.len()) {
            frac_val *= 10;
        }
        let raw = int_val * SCALE + frac_val;
        Ok(Amount(if neg { -raw } else { raw }))
    }

    /// Render as a fixed-8-decimal string, e.g. `"100.50000000"`.
    pub fn to_fixed_string(self) -> String {
        let neg = self.0 < 0;
        let abs = self.0.unsigned_abs();
        let int_part = abs / (SCALE as u128);
        let frac_part = abs % (SCALE as u128);
        format!(
            "{}{}.{:08}",
            if neg { "-" } else { "" },
            int_part,
            frac_part
        )
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Exact `price * quantity`: `(a * b) / SCALE`, truncated toward zero.
    pub fn checked_mul(self, other: Amount) -> Option<Amount> {
        let product = self.0.checked_mul(other.0)?;
        Some(Amount(div_trunc(product, SCALE)))
    }

    /// Exact division: `(a * SCALE) / b`, truncated toward zero.
    pub fn checked_div(self, other: Amount) -> Option<Amount> {
        if other.0 == 0 {
            return None;
        }
        let numerator = self.0.checked_mul(SCALE)?;
        Some(Amount(div_trunc(numerator, other.0)))
    }

    /// `self * bps / 10000`, truncated toward zero.
    pub fn checked_mul_bps(self, bps: i64) -> Option<Amount> {
        let scaled = self.0.checked_mul(bps as i128)?;
        Some(Amount(div_trunc(scaled, 10_000)))
    }

    pub fn abs(self) -> Amount {
        Amount(self.0.abs())
    }

    pub fn min(self, other: Amount) -> Amount {
        if self <= other {
            self
        } else {
            other
        }
    }

    pub fn max(self, other: Amount) -> Amount {
        if self >= other {
            self
        } else {
            other
        }
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// Truncate-toward-zero integer division (distinct from `i128`'s own
/// truncating `/`, which already truncates toward zero for `i128` — spelled
/// out here so the rounding rule is explicit at every call site).
fn div_trunc(numerator: i128, denominator: i128) -> i128 {
    numerator / denominator
}

impl FromStr for Amount {
    type Err = AmountError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fixed_string())
    }
}

impl std::ops::Add for Amount {
    type Output = Amount;
    fn add(self, rhs: Amount) -> Amount {
        self.checked_add(rhs).expect("Amount addition overflow")
    }
}

impl std::ops::Sub for Amount {
    type Output = Amount;
    fn sub(self, rhs: Amount) -> Amount {
        self.checked_sub(rhs).expect("Amount subtraction overflow")
    }
}

impl std::ops::Neg for Amount {
    type Output = Amount;
    fn neg(self) -> Amount {
        Amount(-self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_fixed_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Amount::parse(&s).map_err(D::Error::custom)
    }
}

// Partial ordering is derived via the `PartialOrd`/`Ord` derive above (tuple
// struct of one field behaves correctly); this explicit impl block exists
// only to attach a helper used by book iteration.
impl Amount {
    pub fn cmp_desc(&self, other: &Amount) -> Ordering {
        other.0.cmp(&self.0)
    }
}
