//! Contract Values - Typed field data carried by ledger contracts
//!
//! Ledger payloads arrive as JSON. Plain JSON kinds map directly onto
//! [`ContractValue`]; the kinds JSON cannot express are written as
//! single-key tagged objects:
//!
//! - `{"$decimal": "10.50"}`
//! - `{"$date": "2024-03-01"}`
//! - `{"$timestamp": "2024-03-01T10:00:00Z"}`
//! - `{"$cid": "#12:0"}`

use crate::error::{IntegrationError, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use tracing::debug;

lazy_static::lazy_static! {
    static ref DECIMAL_PATTERN: Regex = Regex::new(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?$").expect("invalid regex");
}

/// Field name -> value, in the order the ledger delivered the fields.
pub type ContractData = IndexMap<String, ContractValue>;

/// Opaque ledger contract identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(String);

impl ContractId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContractId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ContractId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Decimal number, kept as the literal text the ledger sent so that
/// trailing zeros and exponents survive (`10.50` stays `10.50`, `1E+2`
/// stays `1E+2`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal(String);

impl Decimal {
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if DECIMAL_PATTERN.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(IntegrationError::Decode(format!("invalid decimal '{}'", text)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ledger timestamp: wall-clock time plus the UTC offset it was observed
/// in, when the source carried one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    local: NaiveDateTime,
    offset: Option<FixedOffset>,
}

impl Timestamp {
    pub fn naive(local: NaiveDateTime) -> Self {
        Self { local, offset: None }
    }

    pub fn with_offset(at: DateTime<FixedOffset>) -> Self {
        Self {
            local: at.naive_local(),
            offset: Some(*at.offset()),
        }
    }

    /// Accepts RFC 3339 text, or an ISO date-time without an offset.
    pub fn parse(text: &str) -> Result<Self> {
        if let Ok(at) = DateTime::parse_from_rfc3339(text) {
            return Ok(Self::with_offset(at));
        }
        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
            .map(Self::naive)
            .map_err(|e| IntegrationError::Decode(format!("invalid timestamp '{}': {}", text, e)))
    }

    pub fn local(&self) -> NaiveDateTime {
        self.local
    }

    /// Zone abbreviation: empty without an offset, `UTC` at zero offset,
    /// otherwise `UTC+HH:MM` / `UTC-HH:MM`.
    pub fn zone_name(&self) -> String {
        let Some(offset) = self.offset else {
            return String::new();
        };
        let seconds = offset.local_minus_utc();
        if seconds == 0 {
            return "UTC".to_string();
        }
        let sign = if seconds < 0 { '-' } else { '+' };
        let seconds = seconds.abs();
        format!("UTC{}{:02}:{:02}", sign, seconds / 3600, (seconds % 3600) / 60)
    }

    pub fn to_iso_string(&self) -> String {
        match self.offset.and_then(|offset| offset.from_local_datetime(&self.local).single()) {
            Some(at) => at.to_rfc3339(),
            None => self.local.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        }
    }
}

/// A single contract field value
#[derive(Debug, Clone, PartialEq)]
pub enum ContractValue {
    Int(i128),
    Float(f64),
    Text(String),
    Decimal(Decimal),
    Date(NaiveDate),
    Timestamp(Timestamp),
    Record(ContractData),
    List(Vec<ContractValue>),
    Bool(bool),
    ContractId(ContractId),
    Null,
}

impl ContractValue {
    pub fn as_record(&self) -> Option<&ContractData> {
        match self {
            ContractValue::Record(fields) => Some(fields),
            _ => None,
        }
    }

    /// Decodes a JSON field value. Tagged objects whose tag is unknown, or
    /// whose payload does not parse, fall back to a plain record or text so
    /// that one odd field never rejects the whole contract.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => ContractValue::Null,
            Value::Bool(b) => ContractValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ContractValue::Int(i.into())
                } else if let Some(u) = n.as_u64() {
                    ContractValue::Int(u.into())
                } else {
                    ContractValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => ContractValue::Text(s),
            Value::Array(items) => {
                ContractValue::List(items.into_iter().map(Self::from_json).collect())
            }
            Value::Object(map) => {
                if map.len() == 1 {
                    if let Some((tag, inner)) = map.iter().next() {
                        if let Some(typed) = Self::from_tagged(tag, inner) {
                            return typed;
                        }
                    }
                }
                ContractValue::Record(
                    map.into_iter()
                        .map(|(key, field)| (key, Self::from_json(field)))
                        .collect(),
                )
            }
        }
    }

    /// `None` when `tag` is not a value tag. A known tag with a bad payload
    /// keeps the payload text.
    fn from_tagged(tag: &str, inner: &Value) -> Option<Self> {
        if !matches!(tag, "$decimal" | "$date" | "$timestamp" | "$cid") {
            return None;
        }
        let text = match inner {
            Value::String(s) => s.clone(),
            Value::Number(n) if tag == "$decimal" => decimal_text(n),
            _ => return None,
        };

        let typed = match tag {
            "$decimal" => Decimal::parse(&text).map(ContractValue::Decimal),
            "$date" => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                .map(ContractValue::Date)
                .map_err(|e| IntegrationError::Decode(format!("invalid date '{}': {}", text, e))),
            "$timestamp" => Timestamp::parse(&text).map(ContractValue::Timestamp),
            _ => Ok(ContractValue::ContractId(ContractId::new(text.clone()))),
        };
        Some(typed.unwrap_or_else(|e| {
            debug!("Keeping {} value as text: {}", tag, e);
            ContractValue::Text(text)
        }))
    }
}

/// Plain positional text of a JSON number (`1e20` becomes
/// `100000000000000000000`).
fn decimal_text(n: &serde_json::Number) -> String {
    if n.is_f64() {
        n.as_f64().map(|f| f.to_string()).unwrap_or_else(|| n.to_string())
    } else {
        n.to_string()
    }
}

impl Serialize for ContractValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ContractValue::Int(i) => serializer.serialize_i128(*i),
            ContractValue::Float(f) => serializer.serialize_f64(*f),
            ContractValue::Text(s) => serializer.serialize_str(s),
            ContractValue::Decimal(d) => serializer.serialize_str(d.as_str()),
            ContractValue::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            ContractValue::Timestamp(t) => serializer.serialize_str(&t.to_iso_string()),
            ContractValue::Record(fields) => fields.serialize(serializer),
            ContractValue::List(items) => items.serialize(serializer),
            ContractValue::Bool(b) => serializer.serialize_bool(*b),
            ContractValue::ContractId(cid) => serializer.serialize_str(cid.as_str()),
            ContractValue::Null => serializer.serialize_unit(),
        }
    }
}

impl<'de> Deserialize<'de> for ContractValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(ContractValue::from_json(value))
    }
}

impl From<i64> for ContractValue {
    fn from(value: i64) -> Self {
        ContractValue::Int(value.into())
    }
}

impl From<f64> for ContractValue {
    fn from(value: f64) -> Self {
        ContractValue::Float(value)
    }
}

impl From<&str> for ContractValue {
    fn from(value: &str) -> Self {
        ContractValue::Text(value.to_string())
    }
}

impl From<String> for ContractValue {
    fn from(value: String) -> Self {
        ContractValue::Text(value)
    }
}

impl From<bool> for ContractValue {
    fn from(value: bool) -> Self {
        ContractValue::Bool(value)
    }
}

impl From<NaiveDate> for ContractValue {
    fn from(value: NaiveDate) -> Self {
        ContractValue::Date(value)
    }
}

impl From<Decimal> for ContractValue {
    fn from(value: Decimal) -> Self {
        ContractValue::Decimal(value)
    }
}

impl From<Timestamp> for ContractValue {
    fn from(value: Timestamp) -> Self {
        ContractValue::Timestamp(value)
    }
}

impl From<ContractId> for ContractValue {
    fn from(value: ContractId) -> Self {
        ContractValue::ContractId(value)
    }
}

impl From<ContractData> for ContractValue {
    fn from(value: ContractData) -> Self {
        ContractValue::Record(value)
    }
}
