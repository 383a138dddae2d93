//! Dotted key-path access into a JSON tree (`docker.compose.project_name`).

use serde_json::{Map, Value};

/// Look up `path` in `root`. An empty path returns the root itself.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    path.split('.')
        .try_fold(root, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

/// Set `path` in `root`, creating intermediate tables as needed. Non-table
/// values on the way are replaced.
pub fn set_path(root: &mut Value, path: &str, value: Value) {
    if path.is_empty() {
        *root = value;
        return;
    }

    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut node = root;
    for segment in parents {
        node = as_table(node)
            .entry((*segment).to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    as_table(node).insert((*last).to_owned(), value);
}

fn as_table(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just made a table"),
    }
}

/// Flatten a tree into `(key, scalar)` pairs.
///
/// `sep` joins table keys, `index` formats array positions (it receives the
/// parent key and the index), and scalars are rendered as plain strings.
pub fn flatten(
    root: &Value,
    prefix: &str,
    sep: &str,
    index: &dyn Fn(&str, usize) -> String,
) -> Vec<(String, String)> {
    let mut out = Vec::new();
    flatten_into(root, prefix.to_owned(), sep, index, &mut out);
    out
}

fn flatten_into(
    node: &Value,
    prefix: String,
    sep: &str,
    index: &dyn Fn(&str, usize) -> String,
    out: &mut Vec<(String, String)>,
) {
    match node {
        Value::Object(map) => {
            for (key, value) in map {
                let child = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}{sep}{key}")
                };
                flatten_into(value, child, sep, index, out);
            }
        }
        Value::Array(items) => {
            for (i, value) in items.iter().enumerate() {
                flatten_into(value, index(&prefix, i), sep, index, out);
            }
        }
        Value::String(s) => out.push((prefix, s.clone())),
        Value::Null => out.push((prefix, String::new())),
        other => out.push((prefix, other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_walks_tables_and_arrays() {
        let root = json!({"a": {"b": [10, {"c": "x"}]}});
        assert_eq!(get_path(&root, "a.b.0"), Some(&json!(10)));
        assert_eq!(get_path(&root, "a.b.1.c"), Some(&json!("x")));
        assert_eq!(get_path(&root, "a.missing"), None);
        assert_eq!(get_path(&root, ""), Some(&root));
    }

    #[test]
    fn set_creates_intermediate_tables() {
        let mut root = json!({});
        set_path(&mut root, "docker.user.uid", json!(1000));
        assert_eq!(root, json!({"docker": {"user": {"uid": 1000}}}));
    }

    #[test]
    fn set_replaces_scalars_on_the_way() {
        let mut root = json!({"a": 1});
        set_path(&mut root, "a.b", json!(true));
        assert_eq!(root, json!({"a": {"b": true}}));
    }

    #[test]
    fn flatten_renders_scalars() {
        let root = json!({"core": {"project": {"name": "app"}, "ports": [80, 443]}});
        let flat = flatten(&root, "", ".", &|p, i| format!("{p}[{i}]"));
        assert!(flat.contains(&("core.project.name".into(), "app".into())));
        assert!(flat.contains(&("core.ports[1]".into(), "443".into())));
    }
}
