//! Request validation for the JSON write endpoints.
//!
//! Request bodies deserialize into typed structs whose fields are
//! [`Input`]s. The serde helpers in [`coerce`] never fail: they record either
//! the coerced value, the absence of one, or why coercion failed. `validator`
//! then runs presence, shape and bound rules through the custom functions in
//! this module, and [`parse_request`] reports the first offending field in
//! this order:
//!
//! 1. a top-level field (or the collection) is absent or null
//! 2. the collection is not a non-empty array
//! 3. a value does not coerce, header first, then each line item in order
//! 4. a domain bound does not hold, header first, then each line item
//!
//! No I/O happens here.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Fractional digits kept by every stored quantity column.
pub const DECIMAL_SCALE: u32 = 4;
/// Total digits of every stored quantity column.
pub const DECIMAL_PRECISION: u32 = 16;

pub const HAZARD_RATINGS: &[&str] = &["I", "II", "III", "IV", "V"];

/// A request value as submitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Input<T> {
    /// Absent or `null`.
    Missing,
    /// Present but not coercible to `T`.
    Invalid(ValidationReason),
    Value(T),
}

impl<T> Default for Input<T> {
    fn default() -> Self {
        Input::Missing
    }
}

impl<T> Input<T> {
    fn from_json(value: Value, coerce: impl FnOnce(&Value) -> Result<T, ValidationReason>) -> Self {
        if value.is_null() {
            return Input::Missing;
        }
        match coerce(&value) {
            Ok(v) => Input::Value(v),
            Err(reason) => Input::Invalid(reason),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Input::Value(v) => Some(v),
            _ => None,
        }
    }

    fn state(&self) -> Result<&T, ValidationReason> {
        match self {
            Input::Missing => Err(ValidationReason::Missing),
            Input::Invalid(reason) => Err(reason.clone()),
            Input::Value(v) => Ok(v),
        }
    }

    /// Unwraps a validated value; `field` names it if validation was skipped.
    pub fn into_value(self, field: impl Into<String>) -> Result<T, ValidationError> {
        match self {
            Input::Value(v) => Ok(v),
            Input::Missing => Err(ValidationError::new(field, ValidationReason::Missing)),
            Input::Invalid(reason) => Err(ValidationError::new(field, reason)),
        }
    }
}

/// serde `deserialize_with` helpers producing [`Input`]s.
///
/// Use together with `#[serde(default)]` so an absent key becomes
/// [`Input::Missing`].
pub mod coerce {
    use super::*;
    use serde::{de::Error as _, Deserialize, Deserializer};

    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<Input<i32>, D::Error> {
        Ok(Input::from_json(Value::deserialize(d)?, coerce_id))
    }

    pub fn date<'de, D: Deserializer<'de>>(d: D) -> Result<Input<NaiveDate>, D::Error> {
        Ok(Input::from_json(Value::deserialize(d)?, coerce_date))
    }

    pub fn decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Input<Decimal>, D::Error> {
        Ok(Input::from_json(Value::deserialize(d)?, coerce_decimal))
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Input<String>, D::Error> {
        Ok(Input::from_json(Value::deserialize(d)?, coerce_text))
    }

    /// Line-item collection. `null` is absent; anything but an array is an
    /// empty collection; a non-object item has none of its fields.
    pub fn lines<'de, D, L>(d: D) -> Result<Option<Vec<L>>, D::Error>
    where
        D: Deserializer<'de>,
        L: DeserializeOwned + Default,
    {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    item @ Value::Object(_) => L::deserialize(item).map_err(D::Error::custom),
                    _ => Ok(L::default()),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            _ => Ok(Some(Vec::new())),
        }
    }
}

/// Range constraint applied to a decimal field after coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Positive,
    NonNegative,
    /// Inclusive range.
    Between(i64, i64),
}

impl Bound {
    pub fn check(&self, value: &Decimal) -> Result<(), ValidationReason> {
        match *self {
            Bound::Positive if value.is_sign_positive() && !value.is_zero() => Ok(()),
            Bound::Positive => Err(ValidationReason::NotPositive),
            Bound::NonNegative if !value.is_sign_negative() || value.is_zero() => Ok(()),
            Bound::NonNegative => Err(ValidationReason::Negative),
            Bound::Between(low, high) => {
                if *value >= Decimal::from(low) && *value <= Decimal::from(high) {
                    Ok(())
                } else {
                    Err(ValidationReason::OutOfRange { low, high })
                }
            }
        }
    }
}

// Custom rules for `#[validate(custom = "...")]`.

/// Present and coercible.
pub fn coerced<T>(input: &Input<T>) -> Result<(), validator::ValidationError> {
    input.state().map(drop).map_err(ValidationReason::into_error)
}

fn bounded(input: &Input<Decimal>, bound: Bound) -> Result<(), validator::ValidationError> {
    let value = input.state().map_err(ValidationReason::into_error)?;
    bound.check(value).map_err(ValidationReason::into_error)
}

pub fn positive(input: &Input<Decimal>) -> Result<(), validator::ValidationError> {
    bounded(input, Bound::Positive)
}

pub fn non_negative(input: &Input<Decimal>) -> Result<(), validator::ValidationError> {
    bounded(input, Bound::NonNegative)
}

pub fn percentage(input: &Input<Decimal>) -> Result<(), validator::ValidationError> {
    bounded(input, Bound::Between(0, 100))
}

pub fn hazard_rating(input: &Input<String>) -> Result<(), validator::ValidationError> {
    let rating = input.state().map_err(ValidationReason::into_error)?;
    if HAZARD_RATINGS.contains(&rating.as_str()) {
        Ok(())
    } else {
        Err(ValidationReason::NotOneOf(HAZARD_RATINGS.join(", ").into()).into_error())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationReason {
    Missing,
    NotNumeric,
    NotInteger,
    NotString,
    Empty,
    InvalidDate,
    EmptyCollection,
    TooPrecise,
    TooLarge,
    NotPositive,
    Negative,
    OutOfRange { low: i64, high: i64 },
    /// Comma separated vocabulary.
    NotOneOf(Cow<'static, str>),
    MalformedBody,
    /// Rule without a dedicated reason, carried by its code.
    Rule(Cow<'static, str>),
}

impl ValidationReason {
    fn code(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::NotNumeric => "not_numeric",
            Self::NotInteger => "not_integer",
            Self::NotString => "not_string",
            Self::Empty => "empty",
            Self::InvalidDate => "invalid_date",
            Self::EmptyCollection => "empty_collection",
            Self::TooPrecise => "too_precise",
            Self::TooLarge => "too_large",
            Self::NotPositive => "not_positive",
            Self::Negative => "negative",
            Self::OutOfRange { .. } => "out_of_range",
            Self::NotOneOf(_) => "not_one_of",
            Self::MalformedBody => "malformed_body",
            Self::Rule(_) => "rule",
        }
    }

    fn into_error(self) -> validator::ValidationError {
        let mut err = validator::ValidationError::new(self.code());
        match &self {
            Self::OutOfRange { low, high } => {
                err.add_param(Cow::from("low"), low);
                err.add_param(Cow::from("high"), high);
            }
            Self::NotOneOf(options) => err.add_param(Cow::from("options"), options),
            _ => {}
        }
        err.message = Some(Cow::Owned(self.to_string()));
        err
    }

    fn from_error(err: &validator::ValidationError) -> Self {
        let param = |name: &str| err.params.get(name);
        match err.code.as_ref() {
            "missing" | "required" => Self::Missing,
            "not_numeric" => Self::NotNumeric,
            "not_integer" => Self::NotInteger,
            "not_string" => Self::NotString,
            "empty" => Self::Empty,
            "invalid_date" => Self::InvalidDate,
            "empty_collection" | "length" => Self::EmptyCollection,
            "too_precise" => Self::TooPrecise,
            "too_large" => Self::TooLarge,
            "not_positive" => Self::NotPositive,
            "negative" => Self::Negative,
            "out_of_range" => Self::OutOfRange {
                low: param("low").and_then(Value::as_i64).unwrap_or(i64::MIN),
                high: param("high").and_then(Value::as_i64).unwrap_or(i64::MAX),
            },
            "not_one_of" => Self::NotOneOf(Cow::Owned(
                param("options")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            )),
            "malformed_body" => Self::MalformedBody,
            other => Self::Rule(Cow::Owned(other.to_string())),
        }
    }

    fn is_bound(&self) -> bool {
        matches!(
            self,
            Self::NotPositive | Self::Negative | Self::OutOfRange { .. }
        )
    }
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("missing"),
            Self::NotNumeric => f.write_str("not numeric"),
            Self::NotInteger => f.write_str("not an integer"),
            Self::NotString => f.write_str("must be a string"),
            Self::Empty => f.write_str("must not be empty"),
            Self::InvalidDate => f.write_str("invalid date"),
            Self::EmptyCollection => f.write_str("must be a non-empty array"),
            Self::TooPrecise => write!(f, "must have at most {} decimal places", DECIMAL_SCALE),
            Self::TooLarge => write!(
                f,
                "must have at most {} integer digits",
                DECIMAL_PRECISION - DECIMAL_SCALE
            ),
            Self::NotPositive => f.write_str("must be greater than 0"),
            Self::Negative => f.write_str("must not be negative"),
            Self::OutOfRange { low, high } => write!(f, "must be between {} and {}", low, high),
            Self::NotOneOf(options) => write!(f, "must be one of {}", options),
            Self::MalformedBody => f.write_str("must be a JSON object"),
            Self::Rule(code) => write!(f, "failed {}", code),
        }
    }
}

impl Serialize for ValidationReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// First offending field of a request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    /// Dotted path, e.g. `materials[2].quantity`.
    pub field: String,
    pub reason: ValidationReason,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: ValidationReason) -> Self {
        Self {
            field: field.into(),
            reason,
        }
    }

    /// Body could not be decoded as a JSON object.
    pub fn malformed_body() -> Self {
        Self::new("body", ValidationReason::MalformedBody)
    }
}

/// Typed request body with a declared field order.
pub trait ValidatedRequest: DeserializeOwned + Validate {
    /// Top-level fields in report order, line-item collection last.
    const FIELDS: &'static [&'static str];
    /// Fields of one line item in report order.
    const LINE_FIELDS: &'static [&'static str] = &[];
}

/// Decodes and validates `body`, returning the first offending field.
pub fn parse_request<R: ValidatedRequest>(body: Value) -> Result<R, ValidationError> {
    if !body.is_object() {
        return Err(ValidationError::malformed_body());
    }
    let request: R = serde_json::from_value(body).map_err(|_| ValidationError::malformed_body())?;
    request
        .validate()
        .map_err(|errors| first_error(&errors, R::FIELDS, R::LINE_FIELDS))?;
    Ok(request)
}

// (phase, section, line index, field position); the smallest is reported.
type Rank = (u8, u8, usize, usize);

fn rank_header(reason: &ValidationReason, position: usize) -> Rank {
    let phase = match reason {
        ValidationReason::Missing => 0,
        ValidationReason::EmptyCollection => 1,
        r if r.is_bound() => 3,
        _ => 2,
    };
    (phase, 0, 0, position)
}

fn rank_line(reason: &ValidationReason, index: usize, position: usize) -> Rank {
    let phase = if reason.is_bound() { 3 } else { 2 };
    (phase, 1, index, position)
}

fn position(fields: &[&str], name: &str) -> usize {
    fields.iter().position(|f| *f == name).unwrap_or(usize::MAX)
}

/// Picks the error a client sees from everything `validator` collected.
pub fn first_error(
    errors: &ValidationErrors,
    fields: &[&str],
    line_fields: &[&str],
) -> ValidationError {
    let mut found: Option<(Rank, ValidationError)> = None;
    let mut offer = |rank: Rank, field: String, reason: ValidationReason| {
        if found.as_ref().map_or(true, |(best, _)| rank < *best) {
            found = Some((rank, ValidationError::new(field, reason)));
        }
    };

    for (name, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(errs) => {
                for err in errs {
                    let reason = ValidationReason::from_error(err);
                    offer(rank_header(&reason, position(fields, name)), name.to_string(), reason);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (index, item) in items {
                    for (line_field, line_kind) in item.errors() {
                        if let ValidationErrorsKind::Field(errs) = line_kind {
                            for err in errs {
                                let reason = ValidationReason::from_error(err);
                                offer(
                                    rank_line(&reason, *index, position(line_fields, line_field)),
                                    format!("{}[{}].{}", name, index, line_field),
                                    reason,
                                );
                            }
                        }
                    }
                }
            }
            ValidationErrorsKind::Struct(_) => {}
        }
    }

    found
        .map(|(_, err)| err)
        .unwrap_or_else(ValidationError::malformed_body)
}

fn coerce_decimal(value: &Value) -> Result<Decimal, ValidationReason> {
    let parsed = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(Decimal::from(u))
            } else {
                // Shortest round-trip text, so 0.1 stays 0.1.
                parse_decimal(&n.to_string())
            }
        }
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    };
    let value = parsed.ok_or(ValidationReason::NotNumeric)?.normalize();

    if value.scale() > DECIMAL_SCALE {
        return Err(ValidationReason::TooPrecise);
    }
    let limit = Decimal::from(10i64.pow(DECIMAL_PRECISION - DECIMAL_SCALE));
    if value.abs() >= limit {
        return Err(ValidationReason::TooLarge);
    }
    Ok(value)
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn coerce_id(value: &Value) -> Result<i32, ValidationReason> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .ok_or(ValidationReason::NotInteger),
        Value::String(s) => s
            .trim()
            .parse::<i32>()
            .map_err(|_| ValidationReason::NotInteger),
        _ => Err(ValidationReason::NotInteger),
    }
}

fn coerce_date(value: &Value) -> Result<NaiveDate, ValidationReason> {
    value
        .as_str()
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
        .ok_or(ValidationReason::InvalidDate)
}

fn coerce_text(value: &Value) -> Result<String, ValidationReason> {
    let text = value.as_str().ok_or(ValidationReason::NotString)?.trim();
    if text.is_empty() {
        return Err(ValidationReason::Empty);
    }
    Ok(text.to_string())
}
