//! Creates, updates and destroys MI variable objects; groups registers;
//! expands children (spec §4.5).
//!
//! Grounded on `dap_server/server/core_data.rs`'s container/lifetime
//! split (one container per scope family, each with its own clear
//! policy) and `dap_server/peripherals/svd_variables.rs`'s
//! group/leaf-variable expansion idiom, reused here for CPU register
//! groups instead of peripheral register groups.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::CoreError;
use crate::gdb_instance::GdbInstance;
use crate::handle_registry::PrimitiveRegistry;
use crate::mi::MiTuple;
use crate::mi_commands::MiCommands;

use super::containers::VariableContainer;
use super::eval_name::{child_eval_name, is_transparent_wrapper, type_is_pointer};
use super::object::VariableObject;
use super::reference::{self, Scope, VARIABLE_TYPE_MASK};
use super::registers::{self, MISC_GROUP};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct VariableEngine {
    local_container: VariableContainer,
    global_container: VariableContainer,
    dynamic_container: VariableContainer,
    /// Membership set of currently-valid frame scope handles (spec
    /// §4.5's "separate ValueHandleRegistryPrimitive<u64>"), so a stale
    /// handle from a prior stop is rejected rather than silently
    /// resolved against a frame that no longer exists.
    frame_handles: PrimitiveRegistry<u64>,
    register_groups_loaded: bool,
    register_groups: HashMap<String, Vec<String>>,
    var_counter: u64,
}

impl Default for VariableEngine {
    fn default() -> Self {
        Self {
            local_container: VariableContainer::new(),
            global_container: VariableContainer::new(),
            dynamic_container: VariableContainer::new(),
            frame_handles: PrimitiveRegistry::new(),
            register_groups_loaded: false,
            register_groups: HashMap::new(),
            var_counter: 0,
        }
    }
}

impl VariableEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_gdb_var_name(&mut self) -> String {
        self.var_counter += 1;
        format!("mcudbg_var_{}", self.var_counter)
    }

    /// Allocate (or reuse) a frame scope handle for `(thread, frame,
    /// scope)` and register it as currently valid.
    pub fn scope_handle(&mut self, thread_id: u32, frame_id: u32, scope: Scope) -> u64 {
        let handle = reference::encode(thread_id, frame_id, scope as u8);
        self.frame_handles.add_object(handle);
        handle
    }

    pub fn is_valid_scope_handle(&self, handle: u64) -> bool {
        self.frame_handles.get_object(handle).is_some()
    }

    fn container_for_scope(&mut self, scope: Scope) -> &mut VariableContainer {
        match scope {
            Scope::Local | Scope::Registers => &mut self.local_container,
            Scope::Global | Scope::Static => &mut self.global_container,
            Scope::Watch => &mut self.dynamic_container,
            Scope::ScopeHandle => &mut self.local_container,
        }
    }

    /// Resolve a variable handle (mask bit set) to its owning container
    /// and look up the object, or `None` if it is not (or no longer) a
    /// known variable handle.
    pub fn get_variable(&self, handle: u64) -> Option<&VariableObject> {
        if !reference::is_variable_handle(handle) {
            return None;
        }
        self.local_container
            .get(handle)
            .or_else(|| self.global_container.get(handle))
            .or_else(|| self.dynamic_container.get(handle))
    }

    /// Create a local variable object for `expr`, evaluated in
    /// `thread_id`/`frame_id`.
    pub async fn create_local(
        &mut self,
        gdb: &GdbInstance,
        thread_id: u32,
        frame_id: u32,
        parent_handle: u64,
        name: &str,
        expr: &str,
    ) -> Result<u64, CoreError> {
        let mi = MiCommands::new(gdb);
        let gdb_name = self.next_gdb_var_name();
        let frame_ref = reference::encode(thread_id, frame_id, Scope::Local as u8);
        let fields = mi
            .var_create(
                &gdb_name,
                &format!("--thread {thread_id} --frame {frame_id}"),
                expr,
            )
            .await?;
        Ok(self.store_created(
            Scope::Local,
            thread_id,
            parent_handle,
            name,
            frame_ref,
            gdb_name,
            &fields,
        ))
    }

    /// Create a global or static variable object (floating, not
    /// frame-bound).
    pub async fn create_global(
        &mut self,
        gdb: &GdbInstance,
        file_id: u32,
        scope: Scope,
        parent_handle: u64,
        name: &str,
        expr: &str,
    ) -> Result<u64, CoreError> {
        let mi = MiCommands::new(gdb);
        let gdb_name = self.next_gdb_var_name();
        let fields = mi.var_create(&gdb_name, "@", expr).await?;
        Ok(self.store_created(scope, file_id, parent_handle, name, 0, gdb_name, &fields))
    }

    /// Create a watch expression. `frame_ref` is `Some` to evaluate in a
    /// specific frame, `None` to evaluate as a global (spec §4.5
    /// "Watch: as global if frame unspecified, else as local").
    /// `expr` may carry a `,<fmt>` suffix (`b,d,o,t,x,X`), which triggers
    /// a post-creation `-var-set-format`.
    pub async fn create_watch(
        &mut self,
        gdb: &GdbInstance,
        thread_id: u32,
        frame_id: Option<u32>,
        parent_handle: u64,
        name: &str,
        expr: &str,
    ) -> Result<u64, CoreError> {
        let (expr, format) = split_format_suffix(expr);
        let mi = MiCommands::new(gdb);
        let gdb_name = self.next_gdb_var_name();

        let fields = match frame_id {
            Some(frame_id) => {
                mi.var_create(
                    &gdb_name,
                    &format!("--thread {thread_id} --frame {frame_id}"),
                    expr,
                )
                .await?
            }
            None => mi.var_create(&gdb_name, "@", expr).await?,
        };

        if let Some(fmt) = format {
            mi.var_set_format(&gdb_name, fmt).await?;
        }

        let frame_ref = frame_id
            .map(|f| reference::encode(thread_id, f, Scope::Watch as u8))
            .unwrap_or(0);
        Ok(self.store_created(
            Scope::Watch,
            thread_id,
            parent_handle,
            name,
            frame_ref,
            gdb_name,
            &fields,
        ))
    }

    fn store_created(
        &mut self,
        scope: Scope,
        thread_or_file_id: u32,
        parent_handle: u64,
        name: &str,
        frame_ref: u64,
        gdb_name: String,
        fields: &MiTuple,
    ) -> u64 {
        let numchild: u32 = fields.get_const("numchild").ok().and_then(|s| s.parse().ok()).unwrap_or(0);
        let value = fields.get_const("value").unwrap_or("").to_string();
        let r#type = fields.get_const("type").unwrap_or("").to_string();
        let dynamic = fields.get_const("dynamic").map(|s| s == "1").unwrap_or(false);
        let display_hint = fields.get_const("displayhint").ok().map(str::to_string);

        let container = self.container_for_scope(scope);
        container.insert(thread_or_file_id, scope, |handle| VariableObject {
            handle,
            scope,
            parent_handle,
            name: name.to_string(),
            frame_ref,
            value: value.clone(),
            r#type: r#type.clone(),
            eval_name: name.to_string(),
            children: Vec::new(),
            gdb_var_name: Some(gdb_name.clone()),
            file_name: None,
            dynamic,
            has_more: false,
            display_hint: display_hint.clone(),
            changed: false,
        });
        if numchild == 0 {
            // Per spec §4.5: `variables_reference` is set only when the
            // object actually has children, so a leaf never points
            // clients back into an empty expansion.
        }
        container.handle_for_key(&super::object::VariableKey {
            parent_handle,
            name: name.to_string(),
            frame_ref,
        })
        .unwrap_or(0)
    }

    /// Build each child's evaluateName from the parent object's own
    /// evaluateName/type, recursing through transparent wrapper nodes
    /// (anonymous unions, access-specifier groupings) per spec §4.5.
    pub async fn list_children(
        &mut self,
        gdb: &GdbInstance,
        parent_handle: u64,
    ) -> Result<Vec<u64>, CoreError> {
        let (parent_gdb_name, parent_eval_name, parent_type, scope, thread_or_file_id) = {
            let parent = self
                .get_variable(parent_handle)
                .ok_or(CoreError::InvalidReference(parent_handle))?;
            let gdb_name = parent
                .gdb_var_name
                .clone()
                .ok_or(CoreError::InvalidReference(parent_handle))?;
            let (thread_or_file_id, _, _) = reference::decode(parent_handle);
            (
                gdb_name,
                parent.eval_name.clone(),
                parent.r#type.clone(),
                parent.scope,
                thread_or_file_id,
            )
        };

        let mi = MiCommands::new(gdb);
        let mut handles = Vec::new();
        self.expand_children(
            gdb,
            &mi,
            &parent_gdb_name,
            &parent_eval_name,
            &parent_type,
            scope,
            thread_or_file_id,
            parent_handle,
            &mut handles,
        )
        .await?;

        if let Some(parent) = self.container_for_scope(scope).get_mut(parent_handle) {
            parent.children = handles.clone();
        }
        Ok(handles)
    }

    #[allow(clippy::too_many_arguments)]
    async fn expand_children(
        &mut self,
        gdb: &GdbInstance,
        mi: &MiCommands<'_>,
        gdb_name: &str,
        parent_eval_name: &str,
        parent_type: &str,
        scope: Scope,
        thread_or_file_id: u32,
        ui_parent_handle: u64,
        out: &mut Vec<u64>,
    ) -> Result<(), CoreError> {
        let fields = mi.var_list_children(gdb_name).await?;
        let Ok(children) = fields.get_list("children") else {
            return Ok(());
        };
        for child in children {
            let Some(c) = child.as_tuple() else { continue };
            // GDB nests each entry one level under a `child` key in some
            // MI versions; tolerate both shapes.
            let c = c.get_tuple("child").unwrap_or(c);
            let name = c.get_const("name").unwrap_or("").to_string();
            let exp = c.get_const("exp").unwrap_or(&name).to_string();
            let child_type = c.get_const("type").unwrap_or("").to_string();
            let numchild: u32 = c.get_const("numchild").ok().and_then(|s| s.parse().ok()).unwrap_or(0);
            let value = c.get_const("value").unwrap_or("").to_string();

            if is_transparent_wrapper(&exp) {
                Box::pin(self.expand_children(
                    gdb,
                    mi,
                    &name,
                    parent_eval_name,
                    parent_type,
                    scope,
                    thread_or_file_id,
                    ui_parent_handle,
                    out,
                ))
                .await?;
                continue;
            }

            let eval_name = child_eval_name(parent_eval_name, parent_type, &exp);
            let eval_name = if let Ok(authoritative) = mi.var_info_path_expression(&name).await {
                authoritative
            } else {
                eval_name
            };

            let container = self.container_for_scope(scope);
            let handle = container.insert(thread_or_file_id, scope, |handle| VariableObject {
                handle,
                scope,
                parent_handle: ui_parent_handle,
                name: exp.clone(),
                frame_ref: 0,
                value: value.clone(),
                r#type: child_type.clone(),
                eval_name: eval_name.clone(),
                children: Vec::new(),
                gdb_var_name: Some(name.clone()),
                file_name: None,
                dynamic: false,
                has_more: false,
                display_hint: None,
                changed: false,
            });
            let _ = numchild;
            out.push(handle);
        }
        Ok(())
    }

    /// Apply `-var-update --all-values *` results to the global and
    /// watch containers (spec §4.5 "Updating on stop").
    pub async fn update_on_stop(&mut self, gdb: &GdbInstance) -> Result<(), CoreError> {
        let mi = MiCommands::new(gdb);
        let changes = mi.var_update_all().await?;
        for change in changes {
            let Ok(name) = change.get_const("name") else { continue };
            let new_value = change.get_const("value").ok().map(str::to_string);
            let type_changed = change.get_const("type_changed").map(|s| s == "true").unwrap_or(false);
            let new_type = change.get_const("new_type").ok().map(str::to_string);
            let dynamic = change.get_const("dynamic").map(|s| s == "1").unwrap_or(false);
            let display_hint = change.get_const("displayhint").ok().map(str::to_string);
            let has_more = change.get_const("has_more").map(|s| s == "1").unwrap_or(false);

            for container in [&mut self.global_container, &mut self.dynamic_container] {
                for obj in container.values_mut() {
                    if obj.gdb_var_name.as_deref() == Some(name) {
                        if let Some(v) = &new_value {
                            obj.value = v.clone();
                        }
                        if type_changed {
                            if let Some(t) = &new_type {
                                obj.r#type = t.clone();
                            }
                        }
                        obj.dynamic = dynamic;
                        obj.display_hint = display_hint.clone();
                        obj.has_more = has_more;
                    }
                }
            }
        }
        Ok(())
    }

    /// Locals and Registers: cleared on every continue, and again on
    /// every stop (spec §3 "Lifetimes"). Best-effort `-var-delete` for
    /// the backing GDB objects.
    pub async fn clear_locals(&mut self, gdb: &GdbInstance) {
        let mi = MiCommands::new(gdb);
        for name in self.local_container.clear() {
            let _ = mi.var_delete(&name).await;
        }
        self.frame_handles.clear();
    }

    pub fn watch_container_remove(&mut self, handle: u64) -> Option<VariableObject> {
        self.dynamic_container.remove(handle)
    }

    /// Release every watch expression this engine has created, the
    /// `dynamic_container` analogue of [`Self::clear_locals`] — used by
    /// `deleteLiveGdbVariables` (spec §6) to avoid leaking GDB var objects
    /// for the life of a [`crate::live_watch::LiveWatch`] session.
    pub async fn clear_watches(&mut self, gdb: &GdbInstance) {
        let mi = MiCommands::new(gdb);
        for name in self.dynamic_container.clear() {
            let _ = mi.var_delete(&name).await;
        }
    }

    // --- Registers -----------------------------------------------------

    /// First-request setup: discover register groups via
    /// `maint print reggroups` / `maint print register-groups`. Both
    /// commands report their table only as `~` console stream text, so
    /// they go through [`GdbInstance::send_command_capture_console`]
    /// rather than the ordinary result-field path the other `-var-*`/
    /// `-data-*` wrappers use.
    pub async fn ensure_register_groups(&mut self, gdb: &GdbInstance) -> Result<(), CoreError> {
        if self.register_groups_loaded {
            return Ok(());
        }
        let (_, reggroups_console) = gdb
            .send_command_capture_console(
                "-interpreter-exec console \"maint print reggroups\"",
                DEFAULT_TIMEOUT,
            )
            .await?;
        let group_names = registers::parse_reggroups(&reggroups_console.concat());

        let (_, rows_console) = gdb
            .send_command_capture_console(
                "-interpreter-exec console \"maint print register-groups\"",
                DEFAULT_TIMEOUT,
            )
            .await?;
        let rows = registers::parse_register_groups(&rows_console.concat());

        let mut by_group: HashMap<String, Vec<String>> = group_names
            .iter()
            .map(|g| (g.clone(), Vec::new()))
            .collect();
        for row in rows {
            let mut placed = false;
            for group in &row.groups {
                if let Some(members) = by_group.get_mut(group) {
                    members.push(row.name.clone());
                    placed = true;
                }
            }
            if !placed {
                by_group.entry(MISC_GROUP.to_string()).or_default().push(row.name.clone());
            }
        }

        self.register_groups = by_group;
        self.register_groups_loaded = true;
        Ok(())
    }

    pub fn register_group_names(&self) -> Vec<String> {
        self.register_groups.keys().cloned().collect()
    }

    pub fn registers_in_group(&self, group: &str) -> &[String] {
        self.register_groups.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Decode `$xpsr`/`$control` bitfields for the given register leaf,
    /// if applicable (spec §4.5).
    pub fn decode_special_register(name: &str, value: u32) -> Option<String> {
        match name {
            "xpsr" | "$xpsr" => Some(registers::decode_xpsr(value)),
            "control" | "$control" => Some(registers::decode_control(value)),
            _ => None,
        }
    }
}

/// Split a watch expression's optional `,<fmt>` suffix
/// (`b,d,o,t,x,X`), per spec §4.5.
fn split_format_suffix(expr: &str) -> (&str, Option<char>) {
    if let Some((base, suffix)) = expr.rsplit_once(',') {
        if suffix.len() == 1 {
            if let Some(c) = suffix.chars().next() {
                if "bdotxX".contains(c) {
                    return (base, Some(c));
                }
            }
        }
    }
    (expr, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_suffix_recognized() {
        assert_eq!(split_format_suffix("foo,x"), ("foo", Some('x')));
        assert_eq!(split_format_suffix("foo"), ("foo", None));
        assert_eq!(split_format_suffix("foo,bar"), ("foo,bar", None));
    }

    #[test]
    fn scope_handle_membership() {
        let mut engine = VariableEngine::new();
        let handle = engine.scope_handle(1, 2, Scope::Local);
        assert!(engine.is_valid_scope_handle(handle));
        engine.frame_handles.clear();
        assert!(!engine.is_valid_scope_handle(handle));
    }

    #[test]
    fn type_is_pointer_check() {
        assert!(type_is_pointer("struct foo *"));
        assert!(!type_is_pointer("struct foo"));
    }
}
