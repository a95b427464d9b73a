//! Case conversion between API attribute names (camelCase) and column names (snake_case).

use serde_json::{Map, Value};

/// Convert a single identifier from snake_case to camelCase.
/// e.g. "user_id" -> "userId", "created_at" -> "createdAt"
pub fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut capitalize_next = false;
    for c in s.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Convert a single identifier from camelCase to snake_case.
/// e.g. "userId" -> "user_id", "createdAt" -> "created_at"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Column name for a model attribute.
pub fn column_name(attribute: &str, underscored: bool) -> String {
    if underscored {
        to_snake_case(attribute)
    } else {
        attribute.to_string()
    }
}

/// Convert all keys of a JSON object from snake_case to camelCase (in place).
/// REST bodies may use either spelling; records are keyed by camelCase attribute.
pub fn object_keys_to_camel_case(obj: &mut Map<String, Value>) {
    let keys: Vec<String> = obj.keys().cloned().collect();
    for k in keys {
        let camel = to_camel_case(&k);
        if camel != k {
            if let Some(v) = obj.remove(&k) {
                obj.insert(camel, v);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_identifiers() {
        assert_eq!(to_snake_case("userId"), "user_id");
        assert_eq!(to_snake_case("passwordHash"), "password_hash");
        assert_eq!(to_snake_case("title"), "title");
        assert_eq!(to_camel_case("created_at"), "createdAt");
        assert_eq!(to_camel_case("id"), "id");
    }

    #[test]
    fn column_name_honours_underscored() {
        assert_eq!(column_name("createdAt", true), "created_at");
        assert_eq!(column_name("createdAt", false), "createdAt");
    }

    #[test]
    fn object_keys_become_camel_case() {
        let mut body = json!({"user_id": "x", "title": "t", "completed": true});
        if let Value::Object(map) = &mut body {
            object_keys_to_camel_case(map);
        }
        assert_eq!(body, json!({"title": "t", "completed": true, "userId": "x"}));
    }
}
