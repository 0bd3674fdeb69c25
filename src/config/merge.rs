//! Deep merge of configuration values.
//!
//! - Mappings: merged key by key (recursive)
//! - Sequences: concatenated, existing entries first
//! - Scalars and mismatched types: incoming wins
use serde_yaml::Value;

/// Merge `incoming` into `base`, returning the combined value.
///
/// The merge is right-biased: on a scalar conflict the value from `incoming`
/// replaces the one from `base`. Keys keep the position they first appeared
/// at, so iterating the result visits `base` keys before new `incoming` keys.
#[must_use]
pub fn deep_merge(base: Value, incoming: Value) -> Value {
    match (base, incoming) {
        (Value::Mapping(mut base_map), Value::Mapping(incoming_map)) => {
            for (key, incoming_value) in incoming_map {
                let merged = match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(std::mem::take(existing), incoming_value),
                    None => incoming_value,
                };
                base_map.insert(key, merged);
            }
            Value::Mapping(base_map)
        }
        (Value::Sequence(mut base_seq), Value::Sequence(incoming_seq)) => {
            base_seq.extend(incoming_seq);
            Value::Sequence(base_seq)
        }
        (_, incoming) => incoming,
    }
}
