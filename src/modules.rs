//! The known runtime API, grouped by module.
//!
//! Recipe exports and imports must name functions from this table. A module
//! may be supplied either by the recipe (exported) or by something else
//! (imported), never both.

use std::collections::BTreeMap;

pub const ASYNC: &str = "async";
pub const CORE: &str = "core";
pub const DYNAMIC: &str = "dynamic";
pub const META: &str = "meta";
pub const SERIALIZE: &str = "serialize";
pub const SI_WASM: &str = "si_wasm";

const ASYNC_FNS: &[&str] = &[
    "ecsact_async_start",
    "ecsact_async_stop",
    "ecsact_async_enqueue_execution_options",
    "ecsact_async_flush_events",
    "ecsact_async_get_current_tick",
    "ecsact_async_stream",
];

const CORE_FNS: &[&str] = &[
    "ecsact_create_registry",
    "ecsact_destroy_registry",
    "ecsact_clear_registry",
    "ecsact_clone_registry",
    "ecsact_hash_registry",
    "ecsact_create_entity",
    "ecsact_ensure_entity",
    "ecsact_entity_exists",
    "ecsact_destroy_entity",
    "ecsact_count_entities",
    "ecsact_get_entities",
    "ecsact_add_component",
    "ecsact_has_component",
    "ecsact_get_component",
    "ecsact_count_components",
    "ecsact_get_components",
    "ecsact_each_component",
    "ecsact_update_component",
    "ecsact_remove_component",
    "ecsact_execute_systems",
    "ecsact_get_entity_execution_status",
    "ecsact_stream",
];

const DYNAMIC_FNS: &[&str] = &[
    "ecsact_system_execution_context_action",
    "ecsact_system_execution_context_add",
    "ecsact_system_execution_context_remove",
    "ecsact_system_execution_context_get",
    "ecsact_system_execution_context_update",
    "ecsact_system_execution_context_has",
    "ecsact_system_execution_context_generate",
    "ecsact_system_execution_context_parent",
    "ecsact_system_execution_context_same",
    "ecsact_system_execution_context_other",
    "ecsact_system_execution_context_entity",
    "ecsact_system_execution_context_id",
    "ecsact_system_execution_context_stream_toggle",
    "ecsact_create_package",
    "ecsact_destroy_package",
    "ecsact_set_package_name",
    "ecsact_create_system",
    "ecsact_set_system_name",
    "ecsact_set_system_execution_impl",
    "ecsact_create_action",
    "ecsact_set_action_name",
    "ecsact_create_component",
    "ecsact_set_component_name",
    "ecsact_destroy_component",
    "ecsact_create_transient",
    "ecsact_set_transient_name",
    "ecsact_destroy_transient",
    "ecsact_add_field",
    "ecsact_remove_field",
    "ecsact_create_enum",
    "ecsact_set_enum_name",
    "ecsact_destroy_enum",
    "ecsact_add_enum_value",
    "ecsact_remove_enum_value",
    "ecsact_add_system_capability",
    "ecsact_update_system_capability",
    "ecsact_remove_system_capability",
    "ecsact_add_system_generate_component_set",
    "ecsact_remove_system_generate_component_set",
    "ecsact_add_child_system",
    "ecsact_remove_child_system",
    "ecsact_reorder_system",
    "ecsact_add_dependency",
    "ecsact_remove_dependency",
];

const META_FNS: &[&str] = &[
    "ecsact_meta_count_packages",
    "ecsact_meta_get_package_ids",
    "ecsact_meta_package_name",
    "ecsact_meta_package_file_path",
    "ecsact_meta_main_package",
    "ecsact_meta_count_dependencies",
    "ecsact_meta_get_dependencies",
    "ecsact_meta_count_components",
    "ecsact_meta_get_component_ids",
    "ecsact_meta_component_name",
    "ecsact_meta_count_transients",
    "ecsact_meta_get_transient_ids",
    "ecsact_meta_transient_name",
    "ecsact_meta_count_actions",
    "ecsact_meta_get_action_ids",
    "ecsact_meta_action_name",
    "ecsact_meta_count_systems",
    "ecsact_meta_get_system_ids",
    "ecsact_meta_system_name",
    "ecsact_meta_count_fields",
    "ecsact_meta_get_field_ids",
    "ecsact_meta_field_name",
    "ecsact_meta_field_type",
    "ecsact_meta_count_enums",
    "ecsact_meta_get_enum_ids",
    "ecsact_meta_enum_name",
    "ecsact_meta_enum_storage_type",
    "ecsact_meta_count_enum_values",
    "ecsact_meta_get_enum_value_ids",
    "ecsact_meta_enum_value_name",
    "ecsact_meta_enum_value",
    "ecsact_meta_decl_full_name",
    "ecsact_meta_system_capabilities_count",
    "ecsact_meta_system_capabilities",
    "ecsact_meta_system_association_fields_count",
    "ecsact_meta_system_association_fields",
    "ecsact_meta_system_generates_count",
    "ecsact_meta_system_generates_ids",
    "ecsact_meta_system_generates_components_count",
    "ecsact_meta_system_generates_components",
    "ecsact_meta_count_child_systems",
    "ecsact_meta_get_child_system_ids",
    "ecsact_meta_get_parent_system_id",
    "ecsact_meta_count_top_level_systems",
    "ecsact_meta_get_top_level_systems",
    "ecsact_meta_get_lazy_iterations",
    "ecsact_meta_system_parallel_execution",
];

const SERIALIZE_FNS: &[&str] = &[
    "ecsact_serialize_action_size",
    "ecsact_serialize_component_size",
    "ecsact_serialize_action",
    "ecsact_serialize_component",
    "ecsact_deserialize_action",
    "ecsact_deserialize_component",
    "ecsact_dump_entities",
    "ecsact_restore_entities",
];

const SI_WASM_FNS: &[&str] = &[
    "ecsactsi_wasm_load",
    "ecsactsi_wasm_load_file",
    "ecsactsi_wasm_unload",
    "ecsactsi_wasm_reset",
    "ecsactsi_wasm_set_trap_handler",
    "ecsactsi_wasm_last_error_message",
    "ecsactsi_wasm_last_error_message_length",
    "ecsactsi_wasm_consume_logs",
    "ecsactsi_wasm_allow_file_read_access",
    "ecsactsi_wasm_set_write_fd",
];

/// Every module and its functions, in lookup order.
pub const MODULES: &[(&str, &[&str])] = &[
    (ASYNC, ASYNC_FNS),
    (CORE, CORE_FNS),
    (DYNAMIC, DYNAMIC_FNS),
    (META, META_FNS),
    (SERIALIZE, SERIALIZE_FNS),
    (SI_WASM, SI_WASM_FNS),
];

/// The module a runtime API function belongs to.
pub fn module_of(function: &str) -> Option<&'static str> {
    MODULES
        .iter()
        .find(|(_, functions)| functions.contains(&function))
        .map(|(module, _)| *module)
}

/// Result of sorting function names into their modules.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ModuleGrouping {
    /// Module name to the given functions belonging to it, in input order.
    pub module_methods: BTreeMap<&'static str, Vec<String>>,
    /// Names not found in any module.
    pub unknown_methods: Vec<String>,
}

/// Sort function names into their runtime API modules.
pub fn group_by_module<S: AsRef<str>>(functions: &[S]) -> ModuleGrouping {
    let mut grouping = ModuleGrouping::default();
    for function in functions {
        let function = function.as_ref();
        match module_of(function) {
            Some(module) => grouping
                .module_methods
                .entry(module)
                .or_default()
                .push(function.to_string()),
            None => grouping.unknown_methods.push(function.to_string()),
        }
    }
    grouping
}
