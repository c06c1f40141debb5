//! Rendering encoded values as PostgREST filter tokens.
//!
//! Filters travel in the query string (`age=gt.30`), so encoded JSON has to be
//! flattened: text verbatim, arrays as Postgres literals (`{a,b}`), `in` lists
//! as `(a,b)`. Items inside a list are double-quoted when they contain
//! characters PostgREST treats as delimiters.

use serde_json::Value as Json;

use super::encode_inferred;
use crate::error::CoercionError;
use crate::value::Value;

const RESERVED: &[char] = &[',', '.', ':', '(', ')', '{', '}', '"', '\\'];

/// Token for a scalar position (`eq.<token>`).
pub fn scalar(value: &Value) -> Result<String, CoercionError> {
    Ok(flatten(&encode_inferred(value)?))
}

/// Token for a list position (`in.(<a>,<b>)`).
pub fn list(value: &Value) -> Result<String, CoercionError> {
    let items = match value {
        Value::Array(items) => items.as_slice(),
        other => std::slice::from_ref(other),
    };
    let rendered = items
        .iter()
        .map(|item| encode_inferred(item).map(|json| quote(&flatten(&json), &json)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("({})", rendered.join(",")))
}

fn flatten(json: &Json) -> String {
    match json {
        Json::Null => "null".to_string(),
        Json::Bool(b) => b.to_string(),
        Json::Number(n) => n.to_string(),
        Json::String(s) => s.clone(),
        Json::Array(items) => {
            let inner: Vec<String> = items.iter().map(|item| quote(&flatten(item), item)).collect();
            format!("{{{}}}", inner.join(","))
        }
        Json::Object(_) => json.to_string(),
    }
}

/// Quote a list item if it could be mistaken for a delimiter or for `null`.
fn quote(token: &str, source: &Json) -> String {
    if matches!(source, Json::String(_) | Json::Object(_)) {
        quote_item(token)
    } else {
        token.to_string()
    }
}

/// Quote a token placed inside a list or a logical group when it contains
/// delimiters, whitespace, or spells `null`.
pub fn quote_item(token: &str) -> String {
    let needs_quotes = token.is_empty()
        || token.eq_ignore_ascii_case("null")
        || token.contains(RESERVED)
        || token.contains(char::is_whitespace);

    if needs_quotes {
        format!("\"{}\"", token.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        token.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coercion::RangeValue;
    use chrono::{DateTime, TimeZone, Utc};

    #[test]
    fn test_scalar_tokens() {
        assert_eq!(scalar(&Value::from("bob.saggett@supabase.io")).unwrap(), "bob.saggett@supabase.io");
        assert_eq!(scalar(&Value::Int(5)).unwrap(), "5");
        assert_eq!(scalar(&Value::Null).unwrap(), "null");
        assert_eq!(
            scalar(&Value::Numeric("98765432109876543210.5".parse().unwrap())).unwrap(),
            "98765432109876543210.5"
        );
        assert_eq!(scalar(&Value::Timestamp(DateTime::<Utc>::MAX_UTC)).unwrap(), "infinity");
        assert_eq!(
            scalar(&Value::Timestamp(Utc.with_ymd_and_hms(2021, 1, 2, 3, 4, 5).unwrap())).unwrap(),
            "2021-01-02T03:04:05+00:00"
        );
    }

    #[test]
    fn test_array_literal_quotes_reserved_items() {
        let value = Value::from(vec!["a", "b,c", "null", "with space"]);
        assert_eq!(scalar(&value).unwrap(), r#"{a,"b,c","null","with space"}"#);
    }

    #[test]
    fn test_list_tokens() {
        assert_eq!(list(&Value::from(vec![1, 2, 3])).unwrap(), "(1,2,3)");
        assert_eq!(list(&Value::from(vec!["x", "y.z"])).unwrap(), r#"(x,"y.z")"#);
    }

    #[test]
    fn test_quote_item() {
        assert_eq!(quote_item("plain"), "plain");
        assert_eq!(quote_item("a(b)"), r#""a(b)""#);
        assert_eq!(quote_item(r#"say "hi""#), r#""say \"hi\"""#);
    }

    #[test]
    fn test_range_token() {
        let value = Value::from(RangeValue::new(1, 5));
        assert_eq!(scalar(&value).unwrap(), "[1,6)");
    }
}
