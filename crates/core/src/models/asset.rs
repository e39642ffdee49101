//! Fixed-precision asset quantities.
//!
//! An [`Asset`] is an arbitrary-precision signed integer scaled by
//! `10^precision`. Arithmetic is exact and only defined between assets
//! sharing the same [`Symbol`].

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};
use num_traits::{Signed, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

use crate::error::{AssetError, AssetResult};

/// Precision and code of a token (e.g. `4,EOS`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    /// Number of fractional digits.
    pub precision: u8,
    /// Token code.
    pub code: String,
}

impl Symbol {
    pub fn new(precision: u8, code: impl Into<String>) -> Self {
        Self {
            precision,
            code: code.into(),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision, self.code)
    }
}

/// Exact signed quantity of a token.
///
/// Serialized as its text form, e.g. `"-12.3400 EOS"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Asset {
    /// Quantity in the smallest unit (`value * 10^precision`).
    pub amount: BigInt,
    pub symbol: Symbol,
}

impl Asset {
    pub fn new(amount: impl Into<BigInt>, symbol: Symbol) -> Self {
        Self {
            amount: amount.into(),
            symbol,
        }
    }

    /// Zero quantity of `symbol`.
    pub fn zero(symbol: Symbol) -> Self {
        Self::new(BigInt::zero(), symbol)
    }

    /// Parse a user-entered decimal (e.g. `"0.01"`) into an asset of `symbol`.
    ///
    /// Digits beyond the symbol precision are truncated toward zero. An empty
    /// string yields zero; negative or unparseable input is rejected.
    pub fn from_decimal_str(input: &str, symbol: &Symbol) -> AssetResult<Self> {
        let Some(decimal) = parse_decimal(input)? else {
            return Ok(Self::zero(symbol.clone()));
        };

        let (amount, _) = decimal
            .with_scale(i64::from(symbol.precision))
            .as_bigint_and_exponent();

        Ok(Self::new(amount, symbol.clone()))
    }

    /// Check that `input` is accepted by [`Asset::from_decimal_str`].
    pub fn validate_decimal_str(input: &str) -> AssetResult<()> {
        parse_decimal(input).map(|_| ())
    }

    /// Exact sum; both operands must share the same symbol.
    pub fn try_add(&self, other: &Asset) -> AssetResult<Asset> {
        self.ensure_same_symbol(other)?;
        Ok(Self::new(&self.amount + &other.amount, self.symbol.clone()))
    }

    /// Exact difference; both operands must share the same symbol.
    pub fn try_sub(&self, other: &Asset) -> AssetResult<Asset> {
        self.ensure_same_symbol(other)?;
        Ok(Self::new(&self.amount - &other.amount, self.symbol.clone()))
    }

    /// Compare quantities; both operands must share the same symbol.
    pub fn try_cmp(&self, other: &Asset) -> AssetResult<Ordering> {
        self.ensure_same_symbol(other)?;
        Ok(self.amount.cmp(&other.amount))
    }

    pub fn abs(&self) -> Asset {
        Self::new(self.amount.abs(), self.symbol.clone())
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_negative()
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Raw amount as a float, used for ranking.
    pub fn to_f64(&self) -> f64 {
        self.amount.to_f64().unwrap_or_default()
    }

    /// Scaled value (`amount / 10^precision`) as a float, used for charts.
    pub fn to_decimal_f64(&self) -> f64 {
        BigDecimal::new(self.amount.clone(), i64::from(self.symbol.precision))
            .to_f64()
            .unwrap_or_default()
    }

    fn ensure_same_symbol(&self, other: &Asset) -> AssetResult<()> {
        if self.symbol != other.symbol {
            return Err(AssetError::PrecisionMismatch {
                left: self.symbol.to_string(),
                right: other.symbol.to_string(),
            });
        }
        Ok(())
    }
}

/// Non-negative decimal, `None` for blank input.
fn parse_decimal(input: &str) -> AssetResult<Option<BigDecimal>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let decimal = BigDecimal::from_str(trimmed)
        .map_err(|_| AssetError::InvalidThreshold(input.to_string()))?;
    if decimal.is_negative() {
        return Err(AssetError::InvalidThreshold(input.to_string()));
    }
    Ok(Some(decimal))
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = usize::from(self.symbol.precision);
        let digits = self.amount.magnitude().to_string();
        let sign = if self.amount.sign() == Sign::Minus { "-" } else { "" };

        if precision == 0 {
            return write!(f, "{}{} {}", sign, digits, self.symbol.code);
        }

        let padded = format!("{:0>width$}", digits, width = precision + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - precision);
        write!(f, "{}{}.{} {}", sign, int_part, frac_part, self.symbol.code)
    }
}

impl FromStr for Asset {
    type Err = AssetError;

    /// Parse `"<decimal> <CODE>"`; precision is the number of fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AssetError::InvalidAsset(s.to_string());

        let (number, code) = s.trim().split_once(' ').ok_or_else(invalid)?;
        let code = code.trim();
        if code.is_empty() || code.contains(char::is_whitespace) {
            return Err(invalid());
        }

        let (negative, unsigned) = match number.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, number),
        };
        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        let well_formed = !int_part.is_empty()
            && int_part.chars().all(|c| c.is_ascii_digit())
            && frac_part.chars().all(|c| c.is_ascii_digit())
            && !(unsigned.contains('.') && frac_part.is_empty());
        if !well_formed {
            return Err(invalid());
        }

        let precision = u8::try_from(frac_part.len()).map_err(|_| invalid())?;
        let magnitude = BigInt::from_str(&format!("{}{}", int_part, frac_part))
            .map_err(|_| invalid())?;
        let amount = if negative { -magnitude } else { magnitude };

        Ok(Self::new(amount, Symbol::new(precision, code)))
    }
}

impl From<Asset> for String {
    fn from(asset: Asset) -> Self {
        asset.to_string()
    }
}

impl TryFrom<String> for Asset {
    type Error = AssetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eos(amount: i64) -> Asset {
        Asset::new(amount, Symbol::new(4, "EOS"))
    }

    #[test]
    fn parse_and_display_preserve_precision() {
        let asset: Asset = "1.0000 EOS".parse().unwrap();
        assert_eq!(asset, eos(10_000));
        assert_eq!(asset.to_string(), "1.0000 EOS");

        let small: Asset = "0.0042 EOS".parse().unwrap();
        assert_eq!(small.amount, BigInt::from(42));
        assert_eq!(small.to_string(), "0.0042 EOS");

        let negative = eos(-1_2345);
        assert_eq!(negative.to_string(), "-1.2345 EOS");

        let whole: Asset = "17 WAX".parse().unwrap();
        assert_eq!(whole.symbol.precision, 0);
        assert_eq!(whole.to_string(), "17 WAX");
    }

    // Les montants dépassent largement u64 sur certaines chaînes
    #[test]
    fn parse_arbitrary_precision() {
        let huge: Asset = "340282366920938463463374607431768211456.000000001 BIG"
            .parse()
            .unwrap();
        assert_eq!(huge.symbol.precision, 9);
        assert_eq!(
            huge.to_string(),
            "340282366920938463463374607431768211456.000000001 BIG"
        );
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["", "1.0000", "abc EOS", "1. EOS", "1.0000 ", ".5 EOS", "1.0x00 EOS"] {
            assert!(bad.parse::<Asset>().is_err(), "accepted {bad:?}");
        }
    }

    // Test critique: l'arithmétique refuse les symboles différents
    #[test]
    fn arithmetic_requires_same_symbol() {
        let a = eos(500);
        let b = eos(200);
        assert_eq!(a.try_sub(&b).unwrap(), eos(300));
        assert_eq!(b.try_sub(&a).unwrap(), eos(-300));
        assert_eq!(a.try_add(&b).unwrap(), eos(700));
        assert_eq!(a.try_cmp(&b).unwrap(), Ordering::Greater);

        let wax = Asset::new(1, Symbol::new(8, "WAX"));
        let err = a.try_add(&wax).unwrap_err();
        assert!(matches!(err, AssetError::PrecisionMismatch { .. }));

        let other_precision = Asset::new(1, Symbol::new(3, "EOS"));
        assert!(a.try_sub(&other_precision).is_err());
    }

    #[test]
    fn decimal_threshold_truncates_to_precision() {
        let symbol = Symbol::new(4, "EOS");
        assert_eq!(Asset::from_decimal_str("0.01", &symbol).unwrap(), eos(100));
        assert_eq!(Asset::from_decimal_str("0.00019", &symbol).unwrap(), eos(1));
        assert_eq!(Asset::from_decimal_str("25", &symbol).unwrap(), eos(250_000));
        assert_eq!(Asset::from_decimal_str("  ", &symbol).unwrap(), eos(0));

        assert!(matches!(
            Asset::from_decimal_str("-1", &symbol),
            Err(AssetError::InvalidThreshold(_))
        ));
        assert!(Asset::from_decimal_str("ten", &symbol).is_err());

        assert!(Asset::validate_decimal_str("0.5").is_ok());
        assert!(Asset::validate_decimal_str("").is_ok());
        assert!(Asset::validate_decimal_str("-0.5").is_err());
    }

    #[test]
    fn float_conversions() {
        let asset = eos(-12_500);
        assert_eq!(asset.to_f64(), -12_500.0);
        assert!((asset.to_decimal_f64() + 1.25).abs() < f64::EPSILON);
        assert_eq!(asset.abs(), eos(12_500));
    }

    #[test]
    fn serde_uses_text_form() {
        let json = serde_json::to_string(&eos(10_000)).unwrap();
        assert_eq!(json, "\"1.0000 EOS\"");
        let back: Asset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, eos(10_000));
        assert!(serde_json::from_str::<Asset>("\"oops\"").is_err());
    }
}
