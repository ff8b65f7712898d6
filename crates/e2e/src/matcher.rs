//! Subset matching of expected response bodies

use serde_json::Value;

/// Check whether `expected` is contained in `actual`.
///
/// Objects match as a subset: every expected key must exist in `actual` and
/// match recursively, extra keys in `actual` are ignored. Arrays must have the
/// same length and match element by element. Anything else compares by its
/// printed form, so `5` matches `"5"`.
///
/// Non-string scalars print in JSON spelling: `true`, `false` and `null` match
/// the strings `"true"`, `"false"` and `"null"`, not `"True"` or `"None"`.
pub fn subset_match(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Object(expected), Value::Object(actual)) => expected
            .iter()
            .all(|(key, value)| actual.get(key).is_some_and(|a| subset_match(value, a))),
        (Value::Object(_), _) => false,
        (Value::Array(expected), Value::Array(actual)) => {
            expected.len() == actual.len()
                && expected
                    .iter()
                    .zip(actual)
                    .all(|(e, a)| subset_match(e, a))
        }
        (Value::Array(_), _) => false,
        (expected, actual) => printed(expected) == printed(actual),
    }
}

fn printed(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!({}), json!({"status": "ok"}), true; "empty object matches any object")]
    #[test_case(json!({"a": 1}), json!({"a": 1, "b": 2}), true; "extra actual keys ignored")]
    #[test_case(json!({"a": 1, "b": 2}), json!({"a": 1}), false; "missing key fails")]
    #[test_case(json!({"a": 1}), json!([1]), false; "object against array")]
    #[test_case(json!([1, 2]), json!([1, 2, 3]), false; "array length must match")]
    #[test_case(json!([1, 2]), json!([2, 1]), false; "array order matters")]
    #[test_case(json!([]), json!({}), false; "array against object")]
    #[test_case(json!(5), json!("5"), true; "number matches its string form")]
    #[test_case(json!(5), json!(5.0), false; "integer and float print differently")]
    #[test_case(json!(5.0), json!(5.0), true; "floats compare by print")]
    #[test_case(json!(null), json!("null"), true; "null prints as null")]
    #[test_case(json!(true), json!(false), false; "booleans")]
    #[test_case(json!(true), json!("true"), true; "boolean matches json spelling")]
    #[test_case(json!(true), json!("True"), false; "boolean is case sensitive")]
    #[test_case(json!(null), json!("None"), false; "null is not None")]
    fn matches(expected: Value, actual: Value, result: bool) {
        assert_eq!(subset_match(&expected, &actual), result);
    }

    #[test]
    fn nested_depth_levels() {
        let actual = json!({
            "bids": [{"price": 100, "qty": 10, "count": 1}],
            "asks": [
                {"price": 101, "qty": 5, "count": 1},
                {"price": 102, "qty": 7, "count": 2}
            ]
        });

        let expected = json!({
            "asks": [{"price": 101}, {"price": "102", "count": 2}]
        });
        assert!(subset_match(&expected, &actual));

        let wrong_qty = json!({"bids": [{"qty": 11}]});
        assert!(!subset_match(&wrong_qty, &actual));
    }

    #[test]
    fn reflexive_on_structured_values() {
        let value = json!({
            "status": "accepted",
            "trades": [{"price": 100, "qty": 3, "makerId": 1, "takerId": 2}],
            "meta": {"flags": [true, null, "x"]}
        });
        assert!(subset_match(&value, &value));
    }

    #[test]
    fn not_symmetric() {
        let small = json!({"a": 1});
        let large = json!({"a": 1, "b": 2});
        assert!(subset_match(&small, &large));
        assert!(!subset_match(&large, &small));
    }
}
