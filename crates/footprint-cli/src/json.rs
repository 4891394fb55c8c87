//! JSON to value mapping.

use footprint_canonical::Value;
use serde_json::{Number, Value as Json};

fn number_to_value(number: &Number) -> Value {
    if let Some(i) = number.as_i64() {
        Value::from(i)
    } else if let Some(u) = number.as_u64() {
        Value::from(u)
    } else {
        Value::Float(number.as_f64().unwrap_or(f64::NAN))
    }
}

/// Maps JSON onto values: integers stay integers, other numbers become
/// floats, arrays become sequences and objects become mappings.
pub fn json_to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => number_to_value(n),
        Json::String(s) => Value::Str(s.clone()),
        Json::Array(items) => Value::Sequence(items.iter().map(json_to_value).collect()),
        Json::Object(map) => Value::Mapping(
            map.iter()
                .map(|(k, v)| (Value::Str(k.clone()), json_to_value(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integers_and_floats_stay_distinct() {
        assert_eq!(json_to_value(&json!(1)), Value::from(1));
        assert_eq!(json_to_value(&json!(1.0)), Value::Float(1.0));
        assert_eq!(json_to_value(&json!(u64::MAX)), Value::from(u64::MAX));
    }

    #[test]
    fn objects_become_mappings() {
        let value = json_to_value(&json!({"b": [true, null], "a": "x"}));
        assert_eq!(
            value,
            Value::map([
                ("a", Value::from("x")),
                ("b", Value::seq([Value::Bool(true), Value::Null])),
            ])
        );
    }
}
