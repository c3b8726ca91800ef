//! Conversion of raw literals into typed values.
//!
//! Integers accept an optional sign and the `0x`, `0o`, `0b` prefixes; a
//! leading `0` alone means octal. Each width rejects values it cannot hold.

use std::{fmt, num::IntErrorKind};

use thiserror::Error;

use crate::value::Value;

/// A literal after coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float32(f32),
    Float64(f64),
    String(String),
}

impl Coerced {
    /// The literal as a host value, used when substituting or comparing.
    pub fn to_value(&self) -> Value {
        match self {
            Coerced::Bool(b) => Value::Bool(*b),
            Coerced::Int(n) => Value::Int(*n),
            Coerced::Uint(n) => Value::Uint(*n),
            Coerced::Float32(n) => Value::Float32(*n),
            Coerced::Float64(n) => Value::Float64(*n),
            Coerced::String(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Coerced {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coerced::Bool(b) => write!(f, "{}", b),
            Coerced::Int(n) => write!(f, "{}", n),
            Coerced::Uint(n) => write!(f, "{}", n),
            Coerced::Float32(n) => write!(f, "{}", n),
            Coerced::Float64(n) => write!(f, "{}", n),
            Coerced::String(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoerceError {
    #[error("parsing {raw:?} as {kind}: invalid syntax")]
    Syntax { kind: &'static str, raw: String },

    #[error("parsing {raw:?} as {kind}: value out of range")]
    Range { kind: &'static str, raw: String },
}

/// Converts a raw literal for one field kind.
pub type CoerceFn = fn(&str) -> Result<Coerced, CoerceError>;

fn syntax(kind: &'static str, raw: &str) -> CoerceError {
    CoerceError::Syntax {
        kind,
        raw: raw.to_string(),
    }
}

fn range(kind: &'static str, raw: &str) -> CoerceError {
    CoerceError::Range {
        kind,
        raw: raw.to_string(),
    }
}

pub fn coerce_bool(raw: &str) -> Result<Coerced, CoerceError> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(Coerced::Bool(true)),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(Coerced::Bool(false)),
        _ => Err(syntax("bool", raw)),
    }
}

pub fn coerce_string(raw: &str) -> Result<Coerced, CoerceError> {
    Ok(Coerced::String(raw.to_string()))
}

// Unsigned magnitude with radix prefix detection. Underscores may separate
// digits.
fn parse_magnitude(kind: &'static str, raw: &str, digits: &str) -> Result<u64, CoerceError> {
    let (radix, body) = if let Some(rest) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, rest)
    } else if let Some(rest) = digits
        .strip_prefix("0o")
        .or_else(|| digits.strip_prefix("0O"))
    {
        (8, rest)
    } else if let Some(rest) = digits
        .strip_prefix("0b")
        .or_else(|| digits.strip_prefix("0B"))
    {
        (2, rest)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };

    let well_formed = !body.is_empty()
        && !body.starts_with('_')
        && !body.ends_with('_')
        && !body.contains("__")
        && body.chars().all(|c| c == '_' || c.is_digit(radix));
    if !well_formed {
        return Err(syntax(kind, raw));
    }

    let cleaned: String = body.chars().filter(|&c| c != '_').collect();
    u64::from_str_radix(&cleaned, radix).map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow => range(kind, raw),
        _ => syntax(kind, raw),
    })
}

fn coerce_signed(kind: &'static str, bits: u32, raw: &str) -> Result<Coerced, CoerceError> {
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let magnitude = parse_magnitude(kind, raw, digits)?;
    let limit = 1u64 << (bits - 1);

    if negative {
        if magnitude > limit {
            return Err(range(kind, raw));
        }
        Ok(Coerced::Int((-(magnitude as i128)) as i64))
    } else {
        if magnitude >= limit {
            return Err(range(kind, raw));
        }
        Ok(Coerced::Int(magnitude as i64))
    }
}

fn coerce_unsigned(kind: &'static str, bits: u32, raw: &str) -> Result<Coerced, CoerceError> {
    let magnitude = parse_magnitude(kind, raw, raw)?;
    if bits < 64 && magnitude >= 1u64 << bits {
        return Err(range(kind, raw));
    }
    Ok(Coerced::Uint(magnitude))
}

pub fn coerce_int8(raw: &str) -> Result<Coerced, CoerceError> {
    coerce_signed("int8", 8, raw)
}

pub fn coerce_int16(raw: &str) -> Result<Coerced, CoerceError> {
    coerce_signed("int16", 16, raw)
}

pub fn coerce_int32(raw: &str) -> Result<Coerced, CoerceError> {
    coerce_signed("int32", 32, raw)
}

pub fn coerce_int64(raw: &str) -> Result<Coerced, CoerceError> {
    coerce_signed("int64", 64, raw)
}

pub fn coerce_uint8(raw: &str) -> Result<Coerced, CoerceError> {
    coerce_unsigned("uint8", 8, raw)
}

pub fn coerce_uint16(raw: &str) -> Result<Coerced, CoerceError> {
    coerce_unsigned("uint16", 16, raw)
}

pub fn coerce_uint32(raw: &str) -> Result<Coerced, CoerceError> {
    coerce_unsigned("uint32", 32, raw)
}

pub fn coerce_uint64(raw: &str) -> Result<Coerced, CoerceError> {
    coerce_unsigned("uint64", 64, raw)
}

pub fn coerce_float32(raw: &str) -> Result<Coerced, CoerceError> {
    let value: f32 = raw.parse().map_err(|_| syntax("float32", raw))?;
    // f32 parsing saturates to infinity instead of failing
    if value.is_infinite() && raw.parse::<f64>().is_ok_and(f64::is_finite) {
        return Err(range("float32", raw));
    }
    Ok(Coerced::Float32(value))
}

pub fn coerce_float64(raw: &str) -> Result<Coerced, CoerceError> {
    let value: f64 = raw.parse().map_err(|_| syntax("float64", raw))?;
    Ok(Coerced::Float64(value))
}

/// Coerces `raw` to the kind of an already resolved value. Used when no
/// schema supplied a coercion ahead of evaluation.
///
/// Integer values also accept a finite decimal literal, coerced to
/// `Float64`, so `price > 2.5` works against `{"price": 3}`.
pub fn coerce_for(value: &Value, raw: &str) -> Option<Result<Coerced, CoerceError>> {
    let coerce: CoerceFn = match value {
        Value::Bool(_) => coerce_bool,
        Value::Int(_) => {
            return Some(coerce_int64(raw).or_else(|err| decimal_fallback(raw, err)));
        }
        Value::Uint(_) => {
            return Some(coerce_uint64(raw).or_else(|err| decimal_fallback(raw, err)));
        }
        Value::Float32(_) => coerce_float32,
        Value::Float64(_) => coerce_float64,
        Value::String(_) => coerce_string,
        _ => return None,
    };
    Some(coerce(raw))
}

/// Keeps the integer error when `raw` is not a finite number either.
fn decimal_fallback(raw: &str, err: CoerceError) -> Result<Coerced, CoerceError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Coerced::Float64(value)),
        _ => Err(err),
    }
}
