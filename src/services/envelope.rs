//! Decoding of the response envelopes used by the webhooks.
//!
//! Workflows answer collections in several shapes. Each endpoint decodes
//! through [`decode_collection`], which reports which shape matched and how
//! many records were dropped instead of failing the whole response.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::AppError;

/// Shape in which a collection was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Envelope {
    Bare,
    Data,
    Result,
    Named(&'static str),
    Unrecognized,
}

#[derive(Debug)]
pub struct Decoded<T> {
    pub envelope: Envelope,
    pub items: Vec<T>,
    pub rejected: usize,
}

/// Extracts the raw item list from `body`. Never fails: unknown shapes
/// yield an empty list tagged [`Envelope::Unrecognized`].
pub fn normalize_collection(body: Value, named: &[&'static str]) -> (Envelope, Vec<Value>) {
    match body {
        Value::Array(items) => (Envelope::Bare, items),
        Value::Object(mut map) => {
            if let Some(Value::Array(items)) = map.remove("data") {
                return (Envelope::Data, items);
            }
            if let Some(Value::Array(items)) = map.remove("result") {
                return (Envelope::Result, items);
            }
            for key in named {
                if let Some(Value::Array(items)) = map.remove(*key) {
                    return (Envelope::Named(*key), items);
                }
            }
            (Envelope::Unrecognized, Vec::new())
        }
        _ => (Envelope::Unrecognized, Vec::new()),
    }
}

/// Normalizes `body` and decodes every item into `T`, dropping those that
/// do not match the record layout.
pub fn decode_collection<T: DeserializeOwned>(
    body: Value,
    named: &[&'static str],
    resource: &str,
) -> Decoded<T> {
    let (envelope, raw) = normalize_collection(body, named);
    if envelope == Envelope::Unrecognized {
        log::warn!("Unrecognized {} response format, treating as empty", resource);
    }

    let total = raw.len();
    let items = decode_items::<T>(raw, resource);
    let rejected = total - items.len();
    if rejected > 0 {
        log::warn!("Dropped {} malformed {} record(s)", rejected, resource);
    }

    Decoded {
        envelope,
        items,
        rejected,
    }
}

pub fn decode_items<T: DeserializeOwned>(raw: Vec<Value>, resource: &str) -> Vec<T> {
    raw.into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                log::debug!("Skipping {} record: {}", resource, err);
                None
            }
        })
        .collect()
}

/// Returns the single object carried by `body`, which some workflows wrap
/// in a one-element array.
pub fn single_object(body: Value) -> Result<Map<String, Value>, AppError> {
    match body {
        Value::Object(map) => Ok(map),
        Value::Array(mut items) if !items.is_empty() => match items.swap_remove(0) {
            Value::Object(map) => Ok(map),
            other => Err(AppError::Payload(format!("expected an object, got {}", kind(&other)))),
        },
        other => Err(AppError::Payload(format!("expected an object, got {}", kind(&other)))),
    }
}

/// Decodes a single record, unwrapping `wrapper` when the workflow nests it.
pub fn decode_object<T: DeserializeOwned>(body: Value, wrapper: Option<&str>) -> Result<T, AppError> {
    let mut map = single_object(body)?;
    if let Some(key) = wrapper {
        if let Some(inner @ Value::Object(_)) = map.remove(key) {
            return Ok(serde_json::from_value(inner)?);
        }
    }
    Ok(serde_json::from_value(Value::Object(map))?)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: i64,
    }

    #[test]
    fn accepts_every_known_envelope() {
        let shapes = [
            (json!([{ "id": 1 }]), Envelope::Bare),
            (json!({ "data": [{ "id": 1 }] }), Envelope::Data),
            (json!({ "result": [{ "id": 1 }] }), Envelope::Result),
            (json!({ "companies": [{ "id": 1 }] }), Envelope::Named("companies")),
        ];
        for (body, expected) in shapes {
            let decoded = decode_collection::<Item>(body, &["companies"], "company");
            assert_eq!(decoded.envelope, expected);
            assert_eq!(decoded.items, vec![Item { id: 1 }]);
        }
    }

    #[test]
    fn unrecognized_shapes_become_empty() {
        for body in [json!({ "message": "ok" }), json!("done"), Value::Null, json!({ "data": "x" })] {
            let decoded = decode_collection::<Item>(body, &[], "company");
            assert_eq!(decoded.envelope, Envelope::Unrecognized);
            assert!(decoded.items.is_empty());
        }
    }

    #[test]
    fn malformed_items_are_dropped_and_counted() {
        let decoded = decode_collection::<Item>(json!([{ "id": 1 }, {}, { "id": "x" }]), &[], "company");
        assert_eq!(decoded.items.len(), 1);
        assert_eq!(decoded.rejected, 2);
    }

    #[test]
    fn single_object_unwraps_one_element_arrays() {
        let map = single_object(json!([{ "id": 9 }])).unwrap();
        assert_eq!(map.get("id"), Some(&json!(9)));
        assert!(single_object(json!([])).is_err());
        assert!(single_object(json!(3)).is_err());
    }

    #[test]
    fn decode_object_honours_wrapper() {
        let item: Item = decode_object(json!({ "instance": { "id": 4 } }), Some("instance")).unwrap();
        assert_eq!(item, Item { id: 4 });
        let item: Item = decode_object(json!({ "id": 5 }), Some("instance")).unwrap();
        assert_eq!(item, Item { id: 5 });
    }
}
