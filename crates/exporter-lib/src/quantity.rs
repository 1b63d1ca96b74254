//! Kubernetes resource quantity parsing and unit conversion
//!
//! Quantities are parsed into an exact `digits × 10^scale × 2^shift` form so
//! that conversions round the same way the API server does: milli-values and
//! integer values are both rounded up, never through a lossy float multiply.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while parsing a quantity string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("empty quantity")]
    Empty,
    #[error("invalid number in quantity {0:?}")]
    InvalidNumber(String),
    #[error("invalid suffix {suffix:?} in quantity {quantity:?}")]
    InvalidSuffix { quantity: String, suffix: String },
    #[error("quantity {0:?} is out of range")]
    Overflow(String),
}

/// Suffix table: (suffix, power of ten, power of two)
const SUFFIXES: &[(&str, i32, u32)] = &[
    ("", 0, 0),
    ("n", -9, 0),
    ("u", -6, 0),
    ("m", -3, 0),
    ("k", 3, 0),
    ("M", 6, 0),
    ("G", 9, 0),
    ("T", 12, 0),
    ("P", 15, 0),
    ("E", 18, 0),
    ("Ki", 0, 10),
    ("Mi", 0, 20),
    ("Gi", 0, 30),
    ("Ti", 0, 40),
    ("Pi", 0, 50),
    ("Ei", 0, 60),
];

/// Exact decomposition of a quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedQuantity {
    negative: bool,
    digits: u128,
    scale: i32,
    shift: u32,
}

impl ParsedQuantity {
    /// Value divided by `10^exp`, rounded away from zero
    ///
    /// `ceil_scaled(0)` is the integer value, `ceil_scaled(-3)` the milli-value.
    pub fn ceil_scaled(&self, exp: i32, raw: &str) -> Result<i128, QuantityError> {
        let overflow = || QuantityError::Overflow(raw.to_string());

        let n = self
            .digits
            .checked_mul(1u128 << self.shift)
            .ok_or_else(overflow)?;
        let e = self.scale.checked_sub(exp).ok_or_else(overflow)?;

        let magnitude = if e >= 0 {
            let factor = 10u128.checked_pow(e.unsigned_abs()).ok_or_else(overflow)?;
            n.checked_mul(factor).ok_or_else(overflow)?
        } else {
            match 10u128.checked_pow(e.unsigned_abs()) {
                Some(divisor) => n / divisor + u128::from(n % divisor != 0),
                // Divisor beyond u128 range: any non-zero value rounds to one unit
                None => u128::from(n != 0),
            }
        };

        let magnitude = i128::try_from(magnitude).map_err(|_| overflow())?;
        Ok(if self.negative { -magnitude } else { magnitude })
    }
}

impl FromStr for ParsedQuantity {
    type Err = QuantityError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(QuantityError::Empty);
        }

        let (negative, rest) = if let Some(r) = s.strip_prefix('-') {
            (true, r)
        } else if let Some(r) = s.strip_prefix('+') {
            (false, r)
        } else {
            (false, s)
        };

        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, suffix) = rest.split_at(number_len);

        let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
        if (int_part.is_empty() && frac_part.is_empty()) || frac_part.contains('.') {
            return Err(QuantityError::InvalidNumber(raw.to_string()));
        }

        let mut digits: u128 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()) {
            digits = digits
                .checked_mul(10)
                .and_then(|d| d.checked_add(u128::from(b - b'0')))
                .ok_or_else(|| QuantityError::Overflow(raw.to_string()))?;
        }

        let frac_len =
            i32::try_from(frac_part.len()).map_err(|_| QuantityError::Overflow(raw.to_string()))?;

        let (exp, shift) = parse_suffix(raw, suffix)?;
        let scale = exp
            .checked_sub(frac_len)
            .ok_or_else(|| QuantityError::Overflow(raw.to_string()))?;

        Ok(Self {
            negative,
            digits,
            scale,
            shift,
        })
    }
}

fn parse_suffix(raw: &str, suffix: &str) -> Result<(i32, u32), QuantityError> {
    if let Some(&(_, exp, shift)) = SUFFIXES.iter().find(|(s, _, _)| *s == suffix) {
        return Ok((exp, shift));
    }

    // Decimal exponent form: 1e3, 5E-2
    let invalid = || QuantityError::InvalidSuffix {
        quantity: raw.to_string(),
        suffix: suffix.to_string(),
    };
    let exponent = suffix
        .strip_prefix('e')
        .or_else(|| suffix.strip_prefix('E'))
        .ok_or_else(invalid)?;
    let exp: i32 = exponent.parse().map_err(|_| invalid())?;
    Ok((exp, 0))
}

/// Canonical unit a resource is reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceUnit {
    Core,
    Byte,
    Integer,
}

/// Resource names with a fixed unit; anything else is classified by prefix or as integer
const UNIT_TABLE: &[(&str, ResourceUnit)] = &[
    ("cpu", ResourceUnit::Core),
    ("memory", ResourceUnit::Byte),
    ("storage", ResourceUnit::Byte),
    ("ephemeral-storage", ResourceUnit::Byte),
];

const HUGEPAGES_PREFIX: &str = "hugepages-";

impl ResourceUnit {
    /// Classify a resource name into its reporting unit
    pub fn classify(resource_name: &str) -> Self {
        if let Some(&(_, unit)) = UNIT_TABLE.iter().find(|(name, _)| *name == resource_name) {
            return unit;
        }
        if resource_name.starts_with(HUGEPAGES_PREFIX) {
            return ResourceUnit::Byte;
        }
        ResourceUnit::Integer
    }

    /// Label value used for the `unit` label
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceUnit::Core => "core",
            ResourceUnit::Byte => "byte",
            ResourceUnit::Integer => "integer",
        }
    }

    /// Convert a quantity into this unit
    pub fn convert(&self, quantity: &Quantity) -> Result<f64, QuantityError> {
        match self {
            ResourceUnit::Core => quantity_to_cores(quantity),
            ResourceUnit::Byte => quantity_to_bytes(quantity),
            ResourceUnit::Integer => quantity_to_count(quantity),
        }
    }
}

impl fmt::Display for ResourceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU quantity in cores (milli-precision, rounded up)
pub fn quantity_to_cores(quantity: &Quantity) -> Result<f64, QuantityError> {
    let parsed: ParsedQuantity = quantity.0.parse()?;
    let millis = parsed.ceil_scaled(-3, &quantity.0)?;
    Ok(millis as f64 / 1000.0)
}

/// Byte quantity (integer, rounded up)
pub fn quantity_to_bytes(quantity: &Quantity) -> Result<f64, QuantityError> {
    let parsed: ParsedQuantity = quantity.0.parse()?;
    Ok(parsed.ceil_scaled(0, &quantity.0)? as f64)
}

/// Raw count for resources without a dedicated unit (integer, rounded up)
pub fn quantity_to_count(quantity: &Quantity) -> Result<f64, QuantityError> {
    quantity_to_bytes(quantity)
}
