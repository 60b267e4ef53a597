//! Lenient decoders for request body fields.
//!
//! Clients send numbers either as JSON numbers or as numeric strings, and an
//! empty string is treated like an omitted value. Every decoder yields
//! `Option<T>` so that "field omitted" stays distinguishable from a real value;
//! required-field checks happen in the services.

use rust_decimal::Decimal;
use serde::{de::Error as _, Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

/// Largest total length, in characters, accepted for money values
const MAX_MONEY_CHARS: usize = 32;

/// String field. Numbers are accepted and kept in their textual form.
pub fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!("Invalid text value: {other}."))),
    }
}

/// Decimal field (money). `""` counts as absent.
pub fn optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(D::Error::custom(format!("Invalid decimal value: {other}.")));
        }
    };

    parse_decimal(&raw)
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("Invalid decimal value: \"{raw}\".")))
}

/// Integer field. Integral floats (`2.0`) and numeric strings (`"2"`) are
/// accepted, `""` counts as absent.
pub fn optional_integer<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(value) => value,
    };

    let parsed = match &value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() <= i32::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed
        .and_then(|n| i32::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("Invalid integer value: {value}.")))
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    if raw.len() > MAX_MONEY_CHARS {
        return None;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "optional_string")]
        text: Option<String>,
        #[serde(default, deserialize_with = "optional_decimal")]
        money: Option<Decimal>,
        #[serde(default, deserialize_with = "optional_integer")]
        count: Option<i32>,
    }

    fn probe(value: serde_json::Value) -> Result<Probe, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn omitted_and_null_fields_are_absent() {
        let p = probe(json!({"text": null})).unwrap();
        assert!(p.text.is_none());
        assert!(p.money.is_none());
        assert!(p.count.is_none());
    }

    #[rstest]
    #[case(json!(10.5), dec!(10.5))]
    #[case(json!("25.50"), dec!(25.50))]
    #[case(json!(" 7 "), dec!(7))]
    #[case(json!(0), dec!(0))]
    #[case(json!("1e2"), dec!(100))]
    fn decimals_accept_numbers_and_strings(#[case] input: serde_json::Value, #[case] expected: Decimal) {
        assert_eq!(probe(json!({ "money": input })).unwrap().money, Some(expected));
    }

    #[test]
    fn empty_money_string_is_absent() {
        assert!(probe(json!({"money": ""})).unwrap().money.is_none());
    }

    #[rstest]
    #[case(json!("abc"))]
    #[case(json!(true))]
    #[case(json!([1]))]
    fn bad_decimals_are_rejected(#[case] input: serde_json::Value) {
        let err = probe(json!({ "money": input })).unwrap_err();
        assert!(err.to_string().starts_with("Invalid decimal value"));
    }

    #[rstest]
    #[case(json!(2), 2)]
    #[case(json!("2"), 2)]
    #[case(json!(" 4 "), 4)]
    #[case(json!(3.0), 3)]
    #[case(json!(-1), -1)]
    fn integers_accept_numbers_and_numeric_strings(#[case] input: serde_json::Value, #[case] expected: i32) {
        assert_eq!(probe(json!({ "count": input })).unwrap().count, Some(expected));
    }

    #[rstest]
    #[case(json!("abc"))]
    #[case(json!(2.5))]
    #[case(json!("2.5"))]
    #[case(json!(4_000_000_000_i64))]
    #[case(json!({"n": 1}))]
    fn non_integers_are_rejected(#[case] input: serde_json::Value) {
        let err = probe(json!({ "count": input })).unwrap_err();
        assert!(err.to_string().starts_with("Invalid integer value"));
    }

    #[test]
    fn numbers_are_accepted_as_text() {
        assert_eq!(
            probe(json!({"text": 1001})).unwrap().text.as_deref(),
            Some("1001")
        );
        assert!(probe(json!({"text": false})).is_err());
    }
}
