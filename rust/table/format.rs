//! Cell formatting for table output

use crate::table::schema::Lookup;
use crate::value::{ContractValue, Timestamp};
use chrono::NaiveDate;

/// Cell text for a path whose intermediate nodes are missing.
pub const MISSING_SENTINEL: &str = "0";

pub fn datestr(date: &NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub fn datetimestr(ts: &Timestamp) -> String {
    format!("{} {}", ts.local().format("%d/%m/%Y %H:%M:%S"), ts.zone_name())
}

/// Text of a scalar value; `None` for records, lists, booleans, contract
/// ids and nulls.
pub fn format_scalar(value: &ContractValue) -> Option<String> {
    match value {
        ContractValue::Int(i) => Some(i.to_string()),
        ContractValue::Float(f) => Some(format_float(*f)),
        ContractValue::Text(s) => Some(s.clone()),
        ContractValue::Decimal(d) => Some(d.to_string()),
        ContractValue::Date(d) => Some(datestr(d)),
        ContractValue::Timestamp(t) => Some(datetimestr(t)),
        ContractValue::Record(_)
        | ContractValue::List(_)
        | ContractValue::Bool(_)
        | ContractValue::ContractId(_)
        | ContractValue::Null => None,
    }
}

/// Missing intermediate paths render as the zero sentinel, a known quirk
/// kept for output compatibility.
pub fn format_lookup(found: Lookup<'_>) -> Option<String> {
    match found {
        Lookup::Found(value) => format_scalar(value),
        Lookup::Absent => None,
        Lookup::Missing => Some(MISSING_SENTINEL.to_string()),
    }
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        let text = if value > 0.0 { "inf" } else { "-inf" };
        text.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
