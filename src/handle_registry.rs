//! Value-keyed and primitive registries mapping objects ↔ small positive
//! integers (spec §4.8). Zero is reserved to mean "no reference".
//!
//! Grounded on the `(parent_handle, name, frame_ref)` identity-key
//! pattern from spec §3's `VariableObject`, implemented with the same
//! stable-index-over-a-vec shape the teacher uses for its
//! `RttActiveUpChannel`/`RttActiveDownChannel` tables (`util/rtt.rs`).

use std::collections::HashMap;

/// Anything that can be stored in a [`ValueKeyedRegistry`] must produce a
/// deterministic, stable key: objects with sorted field order, arrays in
/// index order, primitives in canonical form.
pub trait ToValueKey {
    fn to_value_key(&self) -> String;
}

/// Maps objects (identified by a deterministic key) bidirectionally to
/// monotonically increasing positive handles.
pub struct ValueKeyedRegistry<T> {
    next_handle: u64,
    key_to_handle: HashMap<String, u64>,
    handle_to_object: HashMap<u64, (String, T)>,
}

impl<T> Default for ValueKeyedRegistry<T> {
    fn default() -> Self {
        Self {
            next_handle: 1,
            key_to_handle: HashMap::new(),
            handle_to_object: HashMap::new(),
        }
    }
}

impl<T: ToValueKey> ValueKeyedRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing handle if `object`'s key is already present,
    /// otherwise allocates a new one.
    pub fn add_object(&mut self, object: T) -> u64 {
        let key = object.to_value_key();
        if let Some(&handle) = self.key_to_handle.get(&key) {
            return handle;
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        self.key_to_handle.insert(key.clone(), handle);
        self.handle_to_object.insert(handle, (key, object));
        handle
    }

    pub fn get_object(&self, handle: u64) -> Option<&T> {
        self.handle_to_object.get(&handle).map(|(_, obj)| obj)
    }

    pub fn get_object_mut(&mut self, handle: u64) -> Option<&mut T> {
        self.handle_to_object.get_mut(&handle).map(|(_, obj)| obj)
    }

    /// Remove both directions of the mapping for `handle`.
    pub fn release(&mut self, handle: u64) {
        if let Some((key, _)) = self.handle_to_object.remove(&handle) {
            self.key_to_handle.remove(&key);
        }
    }

    pub fn clear(&mut self) {
        self.key_to_handle.clear();
        self.handle_to_object.clear();
    }

    pub fn len(&self) -> usize {
        self.handle_to_object.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handle_to_object.is_empty()
    }
}

/// A small map for objects with no natural key-normalization rule, e.g.
/// packed `(thread, frame, scope)` tuples.
pub struct PrimitiveRegistry<T> {
    next_handle: u64,
    by_handle: HashMap<u64, T>,
}

impl<T> Default for PrimitiveRegistry<T> {
    fn default() -> Self {
        Self {
            next_handle: 1,
            by_handle: HashMap::new(),
        }
    }
}

impl<T: Clone + PartialEq> PrimitiveRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a new handle unless `object` is already present, in
    /// which case the existing handle is returned.
    pub fn add_object(&mut self, object: T) -> u64 {
        if let Some((&handle, _)) = self.by_handle.iter().find(|(_, v)| **v == object) {
            return handle;
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        self.by_handle.insert(handle, object);
        handle
    }

    pub fn get_object(&self, handle: u64) -> Option<&T> {
        self.by_handle.get(&handle)
    }

    pub fn release(&mut self, handle: u64) {
        self.by_handle.remove(&handle);
    }

    pub fn clear(&mut self) {
        self.by_handle.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl ToValueKey for String {
        fn to_value_key(&self) -> String {
            self.clone()
        }
    }

    #[test]
    fn same_key_returns_same_handle() {
        let mut reg = ValueKeyedRegistry::<String>::new();
        let h1 = reg.add_object("foo".to_string());
        let h2 = reg.add_object("foo".to_string());
        assert_eq!(h1, h2);
        let h3 = reg.add_object("bar".to_string());
        assert_ne!(h1, h3);
    }

    #[test]
    fn release_clears_both_directions() {
        let mut reg = ValueKeyedRegistry::<String>::new();
        let h = reg.add_object("foo".to_string());
        assert!(reg.get_object(h).is_some());
        reg.release(h);
        assert!(reg.get_object(h).is_none());
        // Re-adding the same key must mint a new handle, not reuse the
        // released one silently colliding with stale references.
        let h2 = reg.add_object("foo".to_string());
        assert_ne!(h, h2);
    }

    #[test]
    fn handles_start_at_one() {
        let mut reg = ValueKeyedRegistry::<String>::new();
        assert_eq!(reg.add_object("x".to_string()), 1);
    }

    #[test]
    fn primitive_registry_dedups_by_equality() {
        let mut reg = PrimitiveRegistry::<(u32, u32)>::new();
        let h1 = reg.add_object((1, 2));
        let h2 = reg.add_object((1, 2));
        assert_eq!(h1, h2);
        let h3 = reg.add_object((1, 3));
        assert_ne!(h1, h3);
    }
}
