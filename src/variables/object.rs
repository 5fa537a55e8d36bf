//! `VariableObject`: one entry in a variable container (spec §3).

/// Identity key for a variable within one container: two objects with
/// equal keys must map to the same handle (spec §3 "Identity key").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableKey {
    pub parent_handle: u64,
    pub name: String,
    pub frame_ref: u64,
}

#[derive(Debug, Clone)]
pub struct VariableObject {
    pub handle: u64,
    pub scope: crate::variables::reference::Scope,
    pub parent_handle: u64,
    pub name: String,
    pub frame_ref: u64,
    pub value: String,
    pub r#type: String,
    pub eval_name: String,
    pub children: Vec<u64>,
    /// GDB's own `$varN` name for the backing `-var-create` object, if
    /// this variable is GDB-var-object-backed (locals, globals, statics,
    /// watches, registers) rather than a synthetic group node.
    pub gdb_var_name: Option<String>,
    pub file_name: Option<String>,
    pub dynamic: bool,
    pub has_more: bool,
    pub display_hint: Option<String>,
    /// Advisory only per spec §9 open question — never relied on for
    /// correctness.
    pub changed: bool,
}

impl VariableObject {
    pub fn key(&self) -> VariableKey {
        VariableKey {
            parent_handle: self.parent_handle,
            name: self.name.clone(),
            frame_ref: self.frame_ref,
        }
    }
}
