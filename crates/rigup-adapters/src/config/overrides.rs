//! `PREFIX_KEY_SUBKEY` environment overrides.

use std::collections::HashMap;

use serde_json::Value;

/// Replace values in `value` that have a matching environment variable.
///
/// The variable for a nested key is `<PREFIX>_<KEY>_<SUBKEY>`, upper-cased;
/// array items use `<PREFIX>[<index>]`. Only keys already present are
/// overridden. A variable set for a table replaces the whole table.
pub fn apply_env_overrides(value: Value, prefix: &str, env: &HashMap<String, String>) -> Value {
    let prefix = prefix.to_uppercase();
    if let Some(raw) = env.get(&prefix).filter(|raw| !raw.is_empty()) {
        return coerce(raw, &value);
    }

    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, child)| {
                    let child = apply_env_overrides(child, &format!("{prefix}_{key}"), env);
                    (key, child)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, child)| apply_env_overrides(child, &format!("{prefix}[{i}]"), env))
                .collect(),
        ),
        other => other,
    }
}

/// Interpret a raw variable against the value it replaces. Strings stay
/// strings; anything else is parsed as JSON when possible.
fn coerce(raw: &str, current: &Value) -> Value {
    if current.is_string() {
        return Value::String(raw.to_owned());
    }
    match raw {
        "True" => Value::Bool(true),
        "False" => Value::Bool(false),
        _ => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn nested_keys_are_overridden() {
        let value = json!({"project": {"name": "app"}, "fail_fast": false});
        let env = env(&[
            ("RIGUP_OVERRIDE_CORE_PROJECT_NAME", "other"),
            ("RIGUP_OVERRIDE_CORE_FAIL_FAST", "True"),
        ]);
        assert_eq!(
            apply_env_overrides(value, "rigup_override_core", &env),
            json!({"project": {"name": "other"}, "fail_fast": true})
        );
    }

    #[test]
    fn strings_are_not_coerced() {
        let value = json!({"name": "app"});
        let env = env(&[("P_NAME", "123")]);
        assert_eq!(apply_env_overrides(value, "P", &env), json!({"name": "123"}));
    }

    #[test]
    fn numbers_are_parsed() {
        let value = json!({"port": 80, "tags": ["a", "b"]});
        let env = env(&[("P_PORT", "8080"), ("P_TAGS[1]", "c")]);
        assert_eq!(
            apply_env_overrides(value, "P", &env),
            json!({"port": 8080, "tags": ["a", "c"]})
        );
    }

    #[test]
    fn unknown_keys_are_ignored_and_empty_values_skipped() {
        let value = json!({"a": 1});
        let env = env(&[("P_B", "2"), ("P_A", "")]);
        assert_eq!(apply_env_overrides(value, "P", &env), json!({"a": 1}));
    }
}
