//! Override merging for profile records.

use serde_yaml::Value;

/// Merge `overlay` into `base`.
///
/// Mappings are merged key by key, recursing into nested mappings. Every other
/// value type, lists included, replaces the base value wholesale.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                if let Some(base_value) = base_map.get_mut(&key) {
                    deep_merge(base_value, overlay_value);
                } else {
                    base_map.insert(key, overlay_value);
                }
            }
        }
        (base_value, overlay_value) => *base_value = overlay_value,
    }
}

/// Return a merged copy, leaving `base` untouched.
pub fn merged(base: &Value, overlay: Value) -> Value {
    let mut copy = base.clone();
    deep_merge(&mut copy, overlay);
    copy
}
