//! Session-scoped persistence for editable fields.
//!
//! A [`PersistentField`] mirrors every write of the wrapped field into a
//! [`KeyValueStore`] under a fixed key, and restores from that key when it is
//! constructed. The browser build backs the store with `sessionStorage`; tests
//! and non-browser hosts use [`MemoryStore`].
//!
//! Values are stored as JSON text so numbers, strings and enums all survive
//! the string-only storage API.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::EditorError;
use crate::precision::{FormattedValue, RoundedField};
use crate::reactive::{Observable, Subscription};
use crate::scalar::Scalar;

/// String key/value storage scoped to the browsing session.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), EditorError>;
    /// Remove every entry, not only those written by this editor.
    fn clear(&self) -> Result<(), EditorError>;
}

/// In-memory store. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), EditorError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), EditorError> {
        self.entries.borrow_mut().clear();
        Ok(())
    }
}

/// Anything that can be written and read back through a single input type.
pub trait Field {
    type Input: Clone + Serialize + DeserializeOwned + 'static;

    /// Value that, written back, reproduces the field's current state.
    fn current_input(&self) -> Self::Input;
    fn set(&self, input: Self::Input);
}

impl<T> Field for Observable<T>
where
    T: Clone + PartialEq + Serialize + DeserializeOwned + 'static,
{
    type Input = T;

    fn current_input(&self) -> T {
        self.get()
    }

    fn set(&self, input: T) {
        Observable::set(self, input);
    }
}

/// A field whose writes are mirrored into session storage under `key`.
pub struct PersistentField<F: Field> {
    field: F,
    key: String,
    store: Rc<dyn KeyValueStore>,
}

impl<F: Field> PersistentField<F> {
    /// Restore from `store[key]` when present, else keep the field's value;
    /// either way the chosen value is written through to both.
    pub fn wrap(field: F, key: impl Into<String>, store: Rc<dyn KeyValueStore>) -> Self {
        let key = key.into();
        let restored = store.get(&key).and_then(|text| {
            match serde_json::from_str::<F::Input>(&text) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Ignoring undecodable stored value for '{}': {}", key, e);
                    None
                }
            }
        });
        if restored.is_some() {
            debug!("Restored '{}' from session storage", key);
        }
        let initial = restored.unwrap_or_else(|| field.current_input());

        let persistent = Self { field, key, store };
        persistent.set(initial);
        persistent
    }

    /// Write to the store first, then to the field, so observers of the field
    /// always find the store already up to date.
    pub fn set(&self, value: F::Input) {
        match serde_json::to_string(&value) {
            Ok(text) => {
                if let Err(e) = self.store.set(&self.key, &text) {
                    warn!("Could not persist '{}': {}", self.key, e);
                }
            }
            Err(e) => warn!("Could not encode '{}' for storage: {}", self.key, e),
        }
        self.field.set(value);
    }

    /// Wipe the whole session store.
    pub fn clear_all(&self) -> Result<(), EditorError> {
        self.store.clear()
    }
}

// Read-only views of the wrapped field. `set` stays the only write path.

impl<T> PersistentField<Observable<T>>
where
    T: Clone + PartialEq + Serialize + DeserializeOwned + 'static,
{
    pub fn get(&self) -> T {
        self.field.get()
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.field.subscribe(callback)
    }
}

impl PersistentField<FormattedValue> {
    pub fn read(&self) -> String {
        self.field.read()
    }

    pub fn read_raw(&self) -> Scalar {
        self.field.read_raw()
    }

    pub fn subscribe(&self, callback: impl Fn(&Scalar) + 'static) -> Subscription {
        self.field.subscribe(callback)
    }
}

impl PersistentField<RoundedField> {
    pub fn get(&self) -> f64 {
        self.field.get()
    }

    pub fn read(&self) -> String {
        self.field.read()
    }

    pub fn subscribe(&self, callback: impl Fn(&f64) + 'static) -> Subscription {
        self.field.subscribe(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (MemoryStore, Rc<dyn KeyValueStore>) {
        let mem = MemoryStore::new();
        let shared: Rc<dyn KeyValueStore> = Rc::new(mem.clone());
        (mem, shared)
    }

    #[test]
    fn default_is_written_through_when_key_absent() {
        let (mem, shared) = store();
        let f = PersistentField::wrap(Observable::new("CO".to_string()), "formulaX", shared);
        assert_eq!(f.get(), "CO");
        assert_eq!(mem.get("formulaX").as_deref(), Some("\"CO\""));
    }

    #[test]
    fn stored_value_overrides_default() {
        let (mem, shared) = store();
        mem.set("nameX", "\"carbon monoxide\"").unwrap();
        let f = PersistentField::wrap(Observable::new("default".to_string()), "nameX", shared);
        assert_eq!(f.get(), "carbon monoxide");
    }

    #[test]
    fn undecodable_entry_falls_back_to_default() {
        let (mem, shared) = store();
        mem.set("k", "{not json").unwrap();
        let f = PersistentField::wrap(Observable::new(4_i64), "k", shared);
        assert_eq!(f.get(), 4);
        assert_eq!(mem.get("k").as_deref(), Some("4"));
    }

    #[test]
    fn store_is_updated_before_observers_run() {
        let (mem, shared) = store();
        let f = PersistentField::wrap(FormattedValue::new(&Scalar::Number(1.0), 2), "velocityX", shared);
        let seen = Rc::new(RefCell::new(None));
        let (s, m) = (Rc::clone(&seen), mem.clone());
        let _sub = f.subscribe(move |_| *s.borrow_mut() = m.get("velocityX"));
        f.set(Scalar::Number(2.5));
        assert_eq!(seen.borrow().as_deref(), Some("2.5"));
        assert_eq!(f.read(), "2.50");
    }

    #[test]
    fn clear_all_wipes_every_key() {
        let (mem, shared) = store();
        mem.set("unrelated", "1").unwrap();
        let f = PersistentField::wrap(Observable::new(1_i64), "mine", shared);
        f.clear_all().unwrap();
        assert!(mem.is_empty());
    }
}
