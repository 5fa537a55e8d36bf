//! The per-scope-family variable containers backing
//! [`crate::variables::VariableEngine`] (spec §4.5 "Containers").

use std::collections::HashMap;

use super::object::{VariableKey, VariableObject};
use super::reference::{self, Scope, VARIABLE_TYPE_MASK};

/// One container: a key→handle index plus the handle→object table.
/// Identity is `(parent_handle, name, frame_ref)` (spec §3): re-adding an
/// already-present key returns the existing handle instead of minting a
/// new one.
#[derive(Default)]
pub struct VariableContainer {
    by_key: HashMap<VariableKey, u64>,
    by_handle: HashMap<u64, VariableObject>,
    next_index: u32,
}

impl VariableContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the handle for `key` without creating anything.
    pub fn handle_for_key(&self, key: &VariableKey) -> Option<u64> {
        self.by_key.get(key).copied()
    }

    pub fn get(&self, handle: u64) -> Option<&VariableObject> {
        self.by_handle.get(&handle)
    }

    pub fn get_mut(&mut self, handle: u64) -> Option<&mut VariableObject> {
        self.by_handle.get_mut(&handle)
    }

    /// Insert a freshly built object, reusing the handle of an existing
    /// object with the same identity key. `thread_or_file_id` is the
    /// owning thread id (locals/registers) or file id (globals/statics).
    pub fn insert(
        &mut self,
        thread_or_file_id: u32,
        scope: Scope,
        mut build: impl FnMut(u64) -> VariableObject,
    ) -> u64 {
        // Building requires the key, but the key depends on parent_handle
        // and name which the caller already knows; callers construct the
        // object first with a placeholder handle of 0, then we compute
        // the identity key from the built object.
        let probe = build(0);
        let key = probe.key();
        if let Some(&existing) = self.by_key.get(&key) {
            self.by_handle.insert(existing, VariableObject { handle: existing, ..probe });
            return existing;
        }

        let index = self.next_index;
        self.next_index = self.next_index.wrapping_add(1);
        let handle = reference::encode(
            thread_or_file_id,
            index,
            scope as u8 | VARIABLE_TYPE_MASK,
        );
        self.by_key.insert(key, handle);
        self.by_handle.insert(handle, VariableObject { handle, ..probe });
        handle
    }

    /// Remove one object (used when a single watch entry is deleted).
    pub fn remove(&mut self, handle: u64) -> Option<VariableObject> {
        if let Some(obj) = self.by_handle.remove(&handle) {
            self.by_key.remove(&obj.key());
            Some(obj)
        } else {
            None
        }
    }

    /// Clear the whole container, returning the GDB var-object names that
    /// should be deleted with `-var-delete` (best-effort).
    pub fn clear(&mut self) -> Vec<String> {
        let names = self
            .by_handle
            .values()
            .filter_map(|o| o.gdb_var_name.clone())
            .collect();
        self.by_key.clear();
        self.by_handle.clear();
        names
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut VariableObject> {
        self.by_handle.values_mut()
    }

    pub fn len(&self) -> usize {
        self.by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_handle.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(parent: u64, name: &str) -> VariableObject {
        VariableObject {
            handle: 0,
            scope: Scope::Local,
            parent_handle: parent,
            name: name.to_string(),
            frame_ref: 0,
            value: String::new(),
            r#type: String::new(),
            eval_name: name.to_string(),
            children: Vec::new(),
            gdb_var_name: None,
            file_name: None,
            dynamic: false,
            has_more: false,
            display_hint: None,
            changed: false,
        }
    }

    #[test]
    fn same_identity_key_reuses_handle() {
        let mut container = VariableContainer::new();
        let h1 = container.insert(1, Scope::Local, |_| obj(0, "x"));
        let h2 = container.insert(1, Scope::Local, |_| obj(0, "x"));
        assert_eq!(h1, h2);
        let h3 = container.insert(1, Scope::Local, |_| obj(0, "y"));
        assert_ne!(h1, h3);
    }

    #[test]
    fn clear_empties_container_and_returns_gdb_names() {
        let mut container = VariableContainer::new();
        container.insert(1, Scope::Local, |_| {
            let mut o = obj(0, "x");
            o.gdb_var_name = Some("var1".to_string());
            o
        });
        let names = container.clear();
        assert_eq!(names, vec!["var1".to_string()]);
        assert!(container.is_empty());
    }
}
