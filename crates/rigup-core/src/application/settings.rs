//! Typed resolution of a feature's configuration subtree.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tracing::trace;

use crate::{
    application::{ApplicationError, Engine},
    error::{Context, RigupResult},
};

/// Resolve the subtree at `key` into `T`, then write it back.
///
/// Missing fields take `T`'s serde defaults, environment overrides are
/// applied, then `auto_configure` fills environment-dependent values. The
/// resolved tree replaces the raw one so other features see final values.
pub fn resolve_section<T, F>(engine: &Engine, key: &str, auto_configure: F) -> RigupResult<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(&mut T) -> RigupResult<()>,
{
    let raw = match engine.config().get(key) {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(value) => value,
    };

    let parsed: T = from_value(key, raw)?;
    let with_overrides = engine.config().apply_overrides(key, to_value(key, &parsed)?);
    let mut section: T = from_value(key, with_overrides)?;

    auto_configure(&mut section)?;

    let resolved = to_value(key, &section)?;
    trace!(key, "Resolved configuration section");
    engine.config().set(key, resolved);
    Ok(section)
}

fn from_value<T: DeserializeOwned>(key: &str, value: Value) -> RigupResult<T> {
    serde_json::from_value(value).map_err(|e| {
        ApplicationError::InvalidConfiguration {
            key: key.to_owned(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn to_value<T: Serialize>(key: &str, section: &T) -> RigupResult<Value> {
    serde_json::to_value(section).context(format!("serializing '{key}'"))
}
