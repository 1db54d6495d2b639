//! Conditional Component-Info Loading
//!
//! Populates every ComponentInfo category from the combined build-info
//! of built-in and extension components, restricted to the types a
//! project actually places, then refines each category with the
//! block-gated conditional declarations.
//!
//! Companion builds take the union of every conditional value: the
//! companion is a generic runtime that must support any block a user
//! might drag in. Packaged builds take only the conditionals whose
//! guarding block appears in the project's block-usage map.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::build_info::{Category, ComponentBuildInfo};
use crate::info::ComponentInfo;
use crate::{
    unqualified_name, ComponentError, DANGEROUS_PERMISSIONS, LOCATION_PERMISSIONS, WEB_VIEWER_TYPE,
};

/// unqualified type -> (qualified type, block -> values)
type ConditionalMap = HashMap<String, (String, HashMap<String, BTreeSet<String>>)>;

/// Runs the unconditional pass and the conditional merge over the
/// combined build-info slice.
pub struct ComponentInfoLoader<'a> {
    build_info: &'a [ComponentBuildInfo],
    used_types: &'a BTreeSet<String>,
    /// unqualified component type -> block names used by the project
    comp_blocks: &'a HashMap<String, BTreeSet<String>>,
    for_companion: bool,
    uses_location: bool,
    include_dangerous: bool,
}

impl<'a> ComponentInfoLoader<'a> {
    pub fn new(
        build_info: &'a [ComponentBuildInfo],
        used_types: &'a BTreeSet<String>,
        comp_blocks: &'a HashMap<String, BTreeSet<String>>,
    ) -> Self {
        Self {
            build_info,
            used_types,
            comp_blocks,
            for_companion: false,
            uses_location: false,
            include_dangerous: true,
        }
    }

    pub fn for_companion(mut self, companion: bool) -> Self {
        self.for_companion = companion;
        self
    }

    pub fn uses_location(mut self, uses_location: bool) -> Self {
        self.uses_location = uses_location;
        self
    }

    pub fn include_dangerous_permissions(mut self, include: bool) -> Self {
        self.include_dangerous = include;
        self
    }

    /// Populate every category, apply conditional refinement, the
    /// location override, permission constraints, and the companion
    /// dangerous-permission filter.
    pub fn load_all(&self, info: &ComponentInfo) -> Result<(), ComponentError> {
        for category in Category::ALL {
            self.load_category(category, info);
        }

        if self.uses_location {
            debug!("project uses location; forcing location permissions onto WebViewer");
            info.merge_into(Category::Permissions, WEB_VIEWER_TYPE, LOCATION_PERMISSIONS);
        }

        self.load_permission_constraints(info);

        if self.for_companion && !self.include_dangerous {
            info.retain_values(Category::Permissions, |p| {
                !DANGEROUS_PERMISSIONS.contains(&p)
            });
        }

        // Every library any used component needs, flattened for the
        // classpath and the dex input list.
        for entry in self.used_entries() {
            info.add_unique_libs(entry.libraries.iter().cloned());
        }

        Ok(())
    }

    fn used_entries(&self) -> impl Iterator<Item = &ComponentBuildInfo> {
        self.build_info
            .iter()
            .filter(|e| self.used_types.contains(&e.component_type))
    }

    /// Unconditional pass plus conditional collection for one category.
    fn load_category(&self, category: Category, info: &ComponentInfo) {
        let mut conditional = ConditionalMap::new();

        for entry in self.used_entries() {
            let values: BTreeSet<String> = entry
                .category_values(category)
                .iter()
                .filter(|v| !v.is_empty())
                .cloned()
                .collect();

            if values.is_empty() {
                // Older extensions predate several categories; skip.
                debug!(
                    "component {} declares no {}",
                    entry.component_type,
                    category.field()
                );
            } else {
                info.populate_once(category, &entry.component_type, values);
            }

            if let Some(block_map) = entry.conditional_values(category) {
                let slot = conditional
                    .entry(unqualified_name(&entry.component_type).to_string())
                    .or_insert_with(|| (entry.component_type.clone(), HashMap::new()));
                for (block, vals) in block_map {
                    slot.1
                        .entry(block.clone())
                        .or_default()
                        .extend(vals.iter().filter(|v| !v.is_empty()).cloned());
                }
            }
        }

        self.merge_conditionals(category, &conditional, info);
    }

    fn merge_conditionals(&self, category: Category, conditional: &ConditionalMap, info: &ComponentInfo) {
        if self.for_companion {
            // Union every conditional value regardless of block usage.
            for (qualified, blocks) in conditional.values() {
                for values in blocks.values() {
                    info.merge_into(category, qualified, values.iter().cloned());
                }
            }
            return;
        }

        for (unqualified, (qualified, blocks)) in conditional {
            let Some(used_blocks) = self.comp_blocks.get(unqualified) else {
                continue;
            };
            for block in used_blocks {
                if let Some(values) = blocks.get(block) {
                    info.merge_into(category, qualified, values.iter().cloned());
                }
            }
        }
    }

    /// Declared constraints load directly; conditional constraints are
    /// block-gated like plain permissions but never applied for the
    /// companion, which must not be constrained below what any app needs.
    fn load_permission_constraints(&self, info: &ComponentInfo) {
        for entry in self.used_entries() {
            for (permission, attrs) in &entry.permission_constraints {
                info.add_permission_constraints(
                    &entry.component_type,
                    permission,
                    attrs.iter().map(|(k, v)| (k.clone(), json_attr(v))),
                );
            }

            if self.for_companion {
                continue;
            }

            let unqualified = unqualified_name(&entry.component_type);
            let Some(used_blocks) = self.comp_blocks.get(unqualified) else {
                if !entry.conditionals.permission_constraints.is_empty() {
                    warn!(
                        "component {} declares conditional permission constraints but no blocks are used",
                        entry.component_type
                    );
                }
                continue;
            };
            for (block, per_permission) in &entry.conditionals.permission_constraints {
                if !used_blocks.contains(block) {
                    continue;
                }
                for (permission, attrs) in per_permission {
                    info.add_permission_constraints(
                        &entry.component_type,
                        permission,
                        attrs.iter().map(|(k, v)| (k.clone(), json_attr(v))),
                    );
                }
            }
        }
    }
}

fn json_attr(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_info::parse_build_info;

    const CAMERA: &str = "com.blockforge.components.runtime.Camera";
    const TEXTING: &str = "com.blockforge.components.runtime.Texting";

    fn fixture() -> Vec<ComponentBuildInfo> {
        parse_build_info(
            r#"[
                {
                    "type": "com.blockforge.components.runtime.Camera",
                    "permissions": ["android.permission.CAMERA"]
                },
                {
                    "type": "com.blockforge.components.runtime.Texting",
                    "conditionals": {
                        "permissions": {
                            "SendMessage": ["android.permission.SEND_SMS"],
                            "ReceivingEnabled": ["android.permission.RECEIVE_SMS", "android.permission.READ_SMS"]
                        },
                        "broadcastReceivers": {
                            "ReceivingEnabled": ["com.blockforge.components.runtime.util.SmsBroadcastReceiver"]
                        },
                        "permissionConstraints": {
                            "SendMessage": {
                                "android.permission.SEND_SMS": {"maxSdkVersion": 29}
                            }
                        }
                    }
                },
                {
                    "type": "com.blockforge.components.runtime.Pedometer",
                    "permissions": ["android.permission.ACTIVITY_RECOGNITION"]
                }
            ]"#,
        )
        .unwrap()
    }

    fn types(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn blocks(entries: &[(&str, &[&str])]) -> HashMap<String, BTreeSet<String>> {
        entries
            .iter()
            .map(|(t, bs)| (t.to_string(), bs.iter().map(|b| b.to_string()).collect()))
            .collect()
    }

    #[test]
    fn unused_types_contribute_nothing() {
        let build_info = fixture();
        let used = types(&[CAMERA]);
        let comp_blocks = blocks(&[("Camera", &["TakePicture"])]);
        let info = ComponentInfo::new();
        ComponentInfoLoader::new(&build_info, &used, &comp_blocks)
            .load_all(&info)
            .unwrap();

        for category in Category::ALL {
            let snapshot = info.snapshot(category);
            assert!(
                !snapshot.contains_key(TEXTING),
                "{} leaked into {}",
                TEXTING,
                category.field()
            );
        }
    }

    #[test]
    fn unconditional_camera_permission_survives() {
        let build_info = fixture();
        let used = types(&[CAMERA]);
        let comp_blocks = blocks(&[("Camera", &["TakePicture"])]);
        let info = ComponentInfo::new();
        ComponentInfoLoader::new(&build_info, &used, &comp_blocks)
            .load_all(&info)
            .unwrap();

        let perms = info.get(Category::Permissions, CAMERA).unwrap();
        assert_eq!(perms, types(&["android.permission.CAMERA"]));
    }

    #[test]
    fn conditional_permission_gated_by_block_usage() {
        let build_info = fixture();
        let used = types(&[TEXTING]);

        // Block used -> permission appears
        let with_block = blocks(&[("Texting", &["SendMessage"])]);
        let info = ComponentInfo::new();
        ComponentInfoLoader::new(&build_info, &used, &with_block)
            .load_all(&info)
            .unwrap();
        assert_eq!(
            info.get(Category::Permissions, TEXTING).unwrap(),
            types(&["android.permission.SEND_SMS"])
        );

        // No blocks used -> permission absent
        let without_block = blocks(&[("Texting", &[])]);
        let info = ComponentInfo::new();
        ComponentInfoLoader::new(&build_info, &used, &without_block)
            .load_all(&info)
            .unwrap();
        assert!(info.get(Category::Permissions, TEXTING).is_none());
    }

    #[test]
    fn conditional_merge_yields_superset_of_unconditional() {
        let extended = parse_build_info(
            r#"[{
                "type": "com.blockforge.components.runtime.Camera",
                "permissions": ["android.permission.CAMERA"],
                "conditionals": {
                    "permissions": {
                        "RecordVideo": ["android.permission.RECORD_AUDIO"]
                    }
                }
            }]"#,
        )
        .unwrap();
        let used = types(&[CAMERA]);
        let comp_blocks = blocks(&[("Camera", &["RecordVideo"])]);
        let info = ComponentInfo::new();
        ComponentInfoLoader::new(&extended, &used, &comp_blocks)
            .load_all(&info)
            .unwrap();

        let perms = info.get(Category::Permissions, CAMERA).unwrap();
        assert!(perms.contains("android.permission.CAMERA"));
        assert!(perms.contains("android.permission.RECORD_AUDIO"));
    }

    #[test]
    fn companion_takes_union_of_all_conditionals() {
        let build_info = fixture();
        let used = types(&[TEXTING]);
        // Companion ignores the block-usage map entirely
        let comp_blocks = blocks(&[]);
        let info = ComponentInfo::new();
        let loader = ComponentInfoLoader::new(&build_info, &used, &comp_blocks).for_companion(true);
        loader.load_all(&info).unwrap();

        let expected = types(&[
            "android.permission.SEND_SMS",
            "android.permission.RECEIVE_SMS",
            "android.permission.READ_SMS",
        ]);
        assert_eq!(info.get(Category::Permissions, TEXTING).unwrap(), expected);
        assert_eq!(
            info.get(Category::BroadcastReceivers, TEXTING).unwrap(),
            types(&["com.blockforge.components.runtime.util.SmsBroadcastReceiver"])
        );

        // Set union is idempotent: merging again changes nothing
        loader.load_all(&info).unwrap();
        assert_eq!(info.get(Category::Permissions, TEXTING).unwrap(), expected);
    }

    #[test]
    fn location_setting_forces_webviewer_permissions() {
        let build_info = fixture();
        let used = types(&[CAMERA]);
        let comp_blocks = blocks(&[]);
        let info = ComponentInfo::new();
        ComponentInfoLoader::new(&build_info, &used, &comp_blocks)
            .uses_location(true)
            .load_all(&info)
            .unwrap();

        let perms = info.get(Category::Permissions, WEB_VIEWER_TYPE).unwrap();
        assert_eq!(
            perms,
            types(&[
                "android.permission.ACCESS_FINE_LOCATION",
                "android.permission.ACCESS_COARSE_LOCATION",
                "android.permission.ACCESS_MOCK_LOCATION",
            ])
        );
    }

    #[test]
    fn conditional_constraints_skipped_for_companion() {
        let build_info = fixture();
        let used = types(&[TEXTING]);
        let comp_blocks = blocks(&[("Texting", &["SendMessage"])]);

        let info = ComponentInfo::new();
        ComponentInfoLoader::new(&build_info, &used, &comp_blocks)
            .load_all(&info)
            .unwrap();
        assert_eq!(
            info.constraints_for("android.permission.SEND_SMS")
                .get("maxSdkVersion")
                .map(String::as_str),
            Some("29")
        );

        let info = ComponentInfo::new();
        ComponentInfoLoader::new(&build_info, &used, &comp_blocks)
            .for_companion(true)
            .load_all(&info)
            .unwrap();
        assert!(info.constraints_for("android.permission.SEND_SMS").is_empty());
    }

    #[test]
    fn companion_drops_dangerous_permissions_when_disallowed() {
        let build_info = fixture();
        let used = types(&[TEXTING]);
        let comp_blocks = blocks(&[]);
        let info = ComponentInfo::new();
        ComponentInfoLoader::new(&build_info, &used, &comp_blocks)
            .for_companion(true)
            .include_dangerous_permissions(false)
            .load_all(&info)
            .unwrap();

        let perms = info.get(Category::Permissions, TEXTING).unwrap();
        assert!(perms.is_empty(), "dangerous permissions survived: {:?}", perms);
    }
}
