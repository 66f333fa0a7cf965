// ── Provisioning store ──
//
// Flow-scoped key/value map. Seeded by the manager with allocated
// identifiers and names, extended with each task's declared outputs, and
// dropped when the flow returns.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::CoreError;

/// Values one task hands to the tasks after it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskOutputs {
    values: BTreeMap<String, Value>,
}

impl TaskOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with<T: Serialize>(mut self, key: &str, value: T) -> Result<Self, CoreError> {
        self.insert(key, value)?;
        Ok(self)
    }

    pub fn insert<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), CoreError> {
        self.values.insert(key.to_owned(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn into_inner(self) -> BTreeMap<String, Value> {
        self.values
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProvisioningStore {
    values: BTreeMap<String, Value>,
}

impl ProvisioningStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), CoreError> {
        self.values.insert(key.to_owned(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Typed read; a missing key is a wiring bug, not a remote failure.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, CoreError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| CoreError::Internal(format!("provisioning store has no '{key}'")))?;
        serde_json::from_value(value.clone())
            .map_err(|e| CoreError::Internal(format!("provisioning store key '{key}': {e}")))
    }

    /// Typed read that treats a missing key as `None`.
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CoreError> {
        if self.values.contains_key(key) {
            self.get(key).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn merge(&mut self, values: BTreeMap<String, Value>) {
        self.values.extend(values);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn typed_round_trip_and_missing_keys() {
        let mut store = ProvisioningStore::new();
        store.insert("vlan", 1200_u32).unwrap();
        assert_eq!(store.get::<u32>("vlan").unwrap(), 1200);
        assert_eq!(store.get_opt::<u32>("vni").unwrap(), None);
        assert!(matches!(store.get::<u32>("vni"), Err(CoreError::Internal(_))));
        assert!(store.get::<String>("vlan").is_err());
    }

    #[test]
    fn outputs_builder() {
        let out = TaskOutputs::new().with("east_vni", 7_u32).unwrap();
        assert_eq!(out.get::<u32>("east_vni"), Some(7));
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["east_vni"]);
    }
}
