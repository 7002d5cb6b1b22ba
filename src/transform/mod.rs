//! Key naming translation between the wire (snake_case) and the
//! application (camelCase).
//!
//! Only object keys change; arrays are walked, scalars are left alone. Keys
//! that are not plain identifiers (`_id`, `$ref`, `content-type`, `42`) pass
//! through untouched in both directions.

use heck::{ToLowerCamelCase, ToSnakeCase};
use serde_json::{Map, Value};

/// Application payload → wire payload (`firstName` → `first_name`).
pub fn to_wire(value: Value) -> Value {
    rename_keys(value, &snake_key)
}

/// Wire payload → application payload (`first_name` → `firstName`).
pub fn from_wire(value: Value) -> Value {
    rename_keys(value, &camel_key)
}

/// Recursively rewrite every object key with `rename`.
pub fn rename_keys(value: Value, rename: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (rename(&key), rename_keys(value, rename)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| rename_keys(item, rename))
                .collect(),
        ),
        scalar => scalar,
    }
}

pub fn snake_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_snake_case()
    } else {
        key.to_string()
    }
}

pub fn camel_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_lower_camel_case()
    } else {
        key.to_string()
    }
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    chars.next().is_some_and(|first| first.is_ascii_alphabetic())
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn outgoing_keys_become_snake_case() {
        let body = json!({ "firstName": "John", "lastName": "Doe" });
        assert_eq!(
            to_wire(body),
            json!({ "first_name": "John", "last_name": "Doe" })
        );
    }

    #[test]
    fn incoming_keys_become_camel_case_recursively() {
        let body = json!({
            "data": [
                { "note_id": 1, "created_at": "2024-01-01", "owner": { "user_id": 7 } }
            ],
            "next": null
        });
        assert_eq!(
            from_wire(body),
            json!({
                "data": [
                    { "noteId": 1, "createdAt": "2024-01-01", "owner": { "userId": 7 } }
                ],
                "next": null
            })
        );
    }

    #[test]
    fn values_are_never_rewritten() {
        let body = json!({ "title": "some_snake value", "tags": ["camelCase", "snake_case"] });
        assert_eq!(
            from_wire(body.clone()),
            json!({ "title": "some_snake value", "tags": ["camelCase", "snake_case"] })
        );
        assert_eq!(to_wire(body.clone()), body);
    }

    #[test]
    fn non_object_payloads_pass_through() {
        assert_eq!(from_wire(json!("plain")), json!("plain"));
        assert_eq!(to_wire(json!(42)), json!(42));
        assert_eq!(from_wire(Value::Null), Value::Null);
        assert_eq!(to_wire(json!([1, "two", null])), json!([1, "two", null]));
    }

    #[test]
    fn irregular_keys_pass_through() {
        let body = json!({ "_id": 1, "$ref": "x", "content-type": "json", "42": true, "": 0 });
        assert_eq!(from_wire(body.clone()), body);
        assert_eq!(to_wire(body.clone()), body);
    }

    #[test]
    fn snake_camel_round_trip_preserves_keys() {
        let wire = json!({
            "access_token": "t",
            "user": { "first_name": "A", "last_name": "B", "email": "a@b.c" },
            "notes": [{ "category_id": 3, "updated_at": "now" }]
        });
        assert_eq!(to_wire(from_wire(wire.clone())), wire);
    }

    #[test]
    fn error_bodies_are_camelized_like_any_other() {
        assert_eq!(
            from_wire(json!({ "error_message": "Invalid credentials" })),
            json!({ "errorMessage": "Invalid credentials" })
        );
    }
}
