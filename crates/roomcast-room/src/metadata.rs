//! Room metadata: an opaque JSON object with two update modes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How a metadata patch is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeMode {
    /// Nested objects are merged key by key; scalars and arrays in the
    /// patch replace what was there.
    Deep,
    /// Each top-level key of the patch overwrites the stored key.
    Replace,
}

impl MergeMode {
    /// Maps the control plane's `merge` flag.
    pub fn from_flag(merge: bool) -> Self {
        if merge { Self::Deep } else { Self::Replace }
    }
}

/// Arbitrary structured data attached to a room. No schema is enforced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Applies `patch` in the given mode.
    pub fn apply(&mut self, patch: Map<String, Value>, mode: MergeMode) {
        match mode {
            MergeMode::Deep => self.deep_merge(patch),
            MergeMode::Replace => self.replace_keys(patch),
        }
    }

    pub fn deep_merge(&mut self, patch: Map<String, Value>) {
        merge_into(&mut self.0, patch);
    }

    pub fn replace_keys(&mut self, patch: Map<String, Value>) {
        for (key, value) in patch {
            self.0.insert(key, value);
        }
    }
}

fn merge_into(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        match target.get_mut(&key) {
            Some(existing) => merge_value(existing, value),
            None => {
                target.insert(key, value);
            }
        }
    }
}

fn merge_value(target: &mut Value, patch: Value) {
    match patch {
        Value::Object(patch_map) => {
            if let Value::Object(target_map) = target {
                merge_into(target_map, patch_map);
            } else {
                *target = Value::Object(patch_map);
            }
        }
        other => *target = other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test fixture must be an object"),
        }
    }

    #[test]
    fn test_deep_merge_combines_nested_objects() {
        let mut meta = Metadata::default();
        meta.apply(obj(json!({"a": {"x": 1}})), MergeMode::Deep);
        meta.apply(obj(json!({"a": {"y": 2}})), MergeMode::Deep);
        assert_eq!(Value::Object(meta.into_inner()), json!({"a": {"x": 1, "y": 2}}));
    }

    #[test]
    fn test_replace_overwrites_top_level_keys() {
        let mut meta = Metadata::default();
        meta.apply(obj(json!({"a": {"x": 1}})), MergeMode::Replace);
        meta.apply(obj(json!({"a": {"y": 2}})), MergeMode::Replace);
        assert_eq!(Value::Object(meta.into_inner()), json!({"a": {"y": 2}}));
    }

    #[test]
    fn test_replace_keeps_untouched_keys() {
        let mut meta = Metadata::new(obj(json!({"keep": true, "swap": 1})));
        meta.replace_keys(obj(json!({"swap": 2})));
        assert_eq!(Value::Object(meta.into_inner()), json!({"keep": true, "swap": 2}));
    }

    #[test]
    fn test_deep_merge_replaces_arrays_wholesale() {
        let mut meta = Metadata::new(obj(json!({"tags": ["a", "b"], "n": {"list": [1]}})));
        meta.deep_merge(obj(json!({"tags": ["c"], "n": {"list": [2, 3]}})));
        assert_eq!(
            Value::Object(meta.into_inner()),
            json!({"tags": ["c"], "n": {"list": [2, 3]}})
        );
    }

    #[test]
    fn test_deep_merge_object_over_scalar_and_scalar_over_object() {
        let mut meta = Metadata::new(obj(json!({"a": 1, "b": {"c": 1}})));
        meta.deep_merge(obj(json!({"a": {"z": 0}, "b": "flat"})));
        assert_eq!(
            Value::Object(meta.into_inner()),
            json!({"a": {"z": 0}, "b": "flat"})
        );
    }

    #[test]
    fn test_deep_merge_three_levels() {
        let mut meta = Metadata::new(obj(json!({"a": {"b": {"c": 1, "d": 1}}})));
        meta.deep_merge(obj(json!({"a": {"b": {"d": 2, "e": 3}}})));
        assert_eq!(
            Value::Object(meta.into_inner()),
            json!({"a": {"b": {"c": 1, "d": 2, "e": 3}}})
        );
    }

    #[test]
    fn test_merge_mode_from_flag() {
        assert_eq!(MergeMode::from_flag(true), MergeMode::Deep);
        assert_eq!(MergeMode::from_flag(false), MergeMode::Replace);
    }
}
