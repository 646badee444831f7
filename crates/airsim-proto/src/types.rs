use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, SimError};

/// A generic string-keyed dictionary, as AirSim encodes its structs.
pub type StrDict = HashMap<String, rmpv::Value>;

/// Extract a string slice from a [`rmpv::Value`], handling both `String` and `Binary` types.
pub fn value_as_str(val: &rmpv::Value) -> Option<&str> {
    match val {
        rmpv::Value::String(s) => s.as_str(),
        rmpv::Value::Binary(b) => std::str::from_utf8(b).ok(),
        _ => None,
    }
}

/// Extract a key string from a [`rmpv::Value`] map key (handles both `String` and `Binary`).
fn key_to_string(val: rmpv::Value) -> Option<String> {
    match val {
        rmpv::Value::String(s) => s.into_str(),
        rmpv::Value::Binary(b) => String::from_utf8(b).ok(),
        _ => None,
    }
}

/// Extract a `u32` message id from a [`rmpv::Value`].
pub fn value_as_u32(val: &rmpv::Value) -> Option<u32> {
    val.as_u64().and_then(|v| u32::try_from(v).ok())
}

/// Convert a [`rmpv::Value`] to a [`StrDict`], returning `None` if it's not a map.
pub fn value_to_str_dict(val: rmpv::Value) -> Option<StrDict> {
    match val {
        rmpv::Value::Map(pairs) => {
            let mut map = HashMap::with_capacity(pairs.len());
            for (k, v) in pairs {
                let key = key_to_string(k)?;
                map.insert(key, v);
            }
            Some(map)
        }
        _ => None,
    }
}

/// Interpret an RPC result as a bool.
pub fn expect_bool(method: &str, val: &rmpv::Value) -> Result<bool> {
    val.as_bool().ok_or_else(|| wrong_type(method, "bool", val))
}

/// Interpret an RPC result as an integer.
pub fn expect_i64(method: &str, val: &rmpv::Value) -> Result<i64> {
    val.as_i64().ok_or_else(|| wrong_type(method, "integer", val))
}

fn wrong_type(method: &str, expected: &str, got: &rmpv::Value) -> SimError {
    SimError::InvalidMessage(format!("{method} returned {got}, expected {expected}"))
}

/// Serialize a struct into a msgpack map keyed by field name.
///
/// AirSim's RPC adaptors decode structs from named maps, so this goes through
/// `rmp_serde::to_vec_named` rather than the compact array encoding.
pub fn to_value<T: Serialize>(val: &T) -> Result<rmpv::Value> {
    let packed = rmp_serde::to_vec_named(val)?;
    rmpv::decode::read_value(&mut &packed[..])
        .map_err(|e| SimError::InvalidMessage(e.to_string()))
}

/// Deserialize a struct from a msgpack value (map or array form).
pub fn from_value<T: DeserializeOwned>(val: &rmpv::Value) -> Result<T> {
    let mut packed = Vec::new();
    rmpv::encode::write_value(&mut packed, val)
        .map_err(|e| SimError::Io(std::io::Error::other(e)))?;
    Ok(rmp_serde::from_slice(&packed)?)
}
