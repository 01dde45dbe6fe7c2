//! Conversion between plain JSON and Firestore's typed `Value` encoding.

use serde_json::{json, Map, Number, Value};

use crate::error::{Error, Result};

/// Encode a JSON object as a Firestore `fields` map.
pub fn encode_fields(object: &Value) -> Result<Value> {
    let Value::Object(entries) = object else {
        return Err(Error::Unknown(
            "Firestore documents must be JSON objects".to_string(),
        ));
    };
    let fields: Map<String, Value> = entries
        .iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect();
    Ok(Value::Object(fields))
}

/// Encode one JSON value as a Firestore typed value.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(flag) => json!({ "booleanValue": flag }),
        Value::Number(number) => number.as_i64().map_or_else(
            || json!({ "doubleValue": number.as_f64().unwrap_or_default() }),
            // Firestore transports int64 as a decimal string
            |integer| json!({ "integerValue": integer.to_string() }),
        ),
        Value::String(text) => json!({ "stringValue": text }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(entries) => {
            let fields: Map<String, Value> = entries
                .iter()
                .map(|(key, value)| (key.clone(), encode_value(value)))
                .collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

/// Decode a Firestore `fields` map into a plain JSON object.
pub fn decode_fields(fields: &Value) -> Result<Value> {
    let Value::Object(entries) = fields else {
        return Ok(Value::Object(Map::new()));
    };
    let mut object = Map::with_capacity(entries.len());
    for (key, value) in entries {
        object.insert(key.clone(), decode_value(value)?);
    }
    Ok(Value::Object(object))
}

/// Decode one Firestore typed value.
pub fn decode_value(value: &Value) -> Result<Value> {
    let Value::Object(typed) = value else {
        return Err(malformed(value));
    };
    let Some((kind, inner)) = typed.iter().next() else {
        return Err(malformed(value));
    };

    let decoded = match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool().unwrap_or_default()),
        "integerValue" => {
            let integer = match inner {
                Value::String(raw) => raw.parse::<i64>().map_err(|_| malformed(value))?,
                Value::Number(number) => number.as_i64().ok_or_else(|| malformed(value))?,
                _ => return Err(malformed(value)),
            };
            Value::Number(integer.into())
        }
        "doubleValue" => decode_double(inner).ok_or_else(|| malformed(value))?,
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "geoPointValue" => json!({
            "latitude": inner.get("latitude").cloned().unwrap_or(json!(0.0)),
            "longitude": inner.get("longitude").cloned().unwrap_or(json!(0.0)),
        }),
        "arrayValue" => {
            let items = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect::<Result<Vec<_>>>())
                .transpose()?
                .unwrap_or_default();
            Value::Array(items)
        }
        "mapValue" => decode_fields(inner.get("fields").unwrap_or(&Value::Null))?,
        _ => return Err(malformed(value)),
    };
    Ok(decoded)
}

/// Whole doubles decode as integers so they can fill `i64` fields; `f64`
/// fields accept either form.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn decode_double(inner: &Value) -> Option<Value> {
    let double = match inner {
        Value::Number(number) => number.as_f64()?,
        // NaN and Infinity arrive as strings
        Value::String(raw) => raw.parse::<f64>().ok()?,
        _ => return None,
    };
    if double.fract() == 0.0 && double.abs() < 9.0e15 {
        return Some(Value::Number((double as i64).into()));
    }
    Number::from_f64(double).map(Value::Number)
}

fn malformed(value: &Value) -> Error {
    Error::Unknown(format!(
        "malformed Firestore value: {}",
        crate::util::compact_text(&value.to_string())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn encodes_scalars_with_firestore_tags() {
        assert_eq!(encode_value(&json!(42)), json!({ "integerValue": "42" }));
        assert_eq!(encode_value(&json!(46.44)), json!({ "doubleValue": 46.44 }));
        assert_eq!(encode_value(&json!("OPEN")), json!({ "stringValue": "OPEN" }));
        assert_eq!(encode_value(&Value::Null), json!({ "nullValue": null }));
    }

    #[test]
    fn encodes_nested_documents() {
        let document = json!({
            "operatingHours": { "regular": "24/7", "seasonal": [] },
            "deleted": false
        });
        let fields = encode_fields(&document).unwrap();
        assert_eq!(
            fields,
            json!({
                "operatingHours": { "mapValue": { "fields": {
                    "regular": { "stringValue": "24/7" },
                    "seasonal": { "arrayValue": { "values": [] } }
                }}},
                "deleted": { "booleanValue": false }
            })
        );
    }

    #[test]
    fn decodes_remote_document_fields() {
        let fields = json!({
            "name": { "stringValue": "Karawanken" },
            "latitude": { "doubleValue": 46.44 },
            "createdAt": { "integerValue": "1700000000000" },
            "accessibility": { "mapValue": { "fields": {
                "trafficTypes": { "arrayValue": { "values": [
                    { "stringValue": "CAR" }
                ]}}
            }}},
            "empty": { "arrayValue": {} }
        });
        let decoded = decode_fields(&fields).unwrap();
        assert_eq!(
            decoded,
            json!({
                "name": "Karawanken",
                "latitude": 46.44,
                "createdAt": 1_700_000_000_000_i64,
                "accessibility": { "trafficTypes": ["CAR"] },
                "empty": []
            })
        );
    }

    #[test]
    fn whole_doubles_decode_as_integers() {
        assert_eq!(
            decode_value(&json!({ "doubleValue": 1_700_000_000_000.0 })).unwrap(),
            json!(1_700_000_000_000_i64)
        );
        let latitude: f64 =
            serde_json::from_value(decode_value(&json!({ "doubleValue": 46.0 })).unwrap())
                .unwrap();
        assert!((latitude - 46.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_unknown_value_kinds() {
        assert!(decode_value(&json!({ "mysteryValue": 1 })).is_err());
        assert!(decode_value(&json!("bare")).is_err());
    }
}
