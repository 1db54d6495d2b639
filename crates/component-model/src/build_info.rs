//! Component Build-Info Wire Contract
//!
//! One JSON object per component type, emitted by the component
//! annotation compiler and consumed here. Missing category arrays are
//! legal (older extensions predate several categories) and deserialize
//! as empty; malformed JSON is a fatal load error.

use std::collections::HashMap;

use serde::Deserialize;

use crate::ComponentError;

/// Manifest-artifact categories a component may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Assets,
    Activities,
    ActivityMetadata,
    BroadcastReceivers,
    ContentProviders,
    Libraries,
    Metadata,
    MinSdk,
    NativeLibraries,
    Permissions,
    Queries,
    Services,
    Xmls,
}

impl Category {
    pub const ALL: [Category; 13] = [
        Category::Assets,
        Category::Activities,
        Category::ActivityMetadata,
        Category::BroadcastReceivers,
        Category::ContentProviders,
        Category::Libraries,
        Category::Metadata,
        Category::MinSdk,
        Category::NativeLibraries,
        Category::Permissions,
        Category::Queries,
        Category::Services,
        Category::Xmls,
    ];

    /// JSON field name, also the key under `conditionals`.
    pub fn field(&self) -> &'static str {
        match self {
            Category::Assets => "assets",
            Category::Activities => "activities",
            Category::ActivityMetadata => "activityMetaData",
            Category::BroadcastReceivers => "broadcastReceivers",
            Category::ContentProviders => "contentProviders",
            Category::Libraries => "libraries",
            Category::Metadata => "metaData",
            Category::MinSdk => "minSdk",
            Category::NativeLibraries => "nativeLibraries",
            Category::Permissions => "permissions",
            Category::Queries => "queries",
            Category::Services => "services",
            Category::Xmls => "xmls",
        }
    }
}

/// Conditional declarations: a category value granted only when a
/// specific block is used in the project.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Conditionals {
    /// block -> permission -> attribute -> value
    #[serde(rename = "permissionConstraints", default)]
    pub permission_constraints: HashMap<String, HashMap<String, HashMap<String, serde_json::Value>>>,
    /// category -> block -> values
    #[serde(flatten)]
    pub categories: HashMap<String, HashMap<String, Vec<String>>>,
}

/// Build metadata for a single component type.
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentBuildInfo {
    #[serde(rename = "type")]
    pub component_type: String,

    #[serde(default)]
    pub assets: Vec<String>,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(rename = "activityMetaData", default)]
    pub activity_metadata: Vec<String>,
    #[serde(rename = "broadcastReceivers", default)]
    pub broadcast_receivers: Vec<String>,
    #[serde(rename = "contentProviders", default)]
    pub content_providers: Vec<String>,
    #[serde(default)]
    pub libraries: Vec<String>,
    #[serde(rename = "metaData", default)]
    pub metadata: Vec<String>,
    /// Decimal strings; aggregated into the manifest min-SDK floor.
    #[serde(rename = "minSdk", default)]
    pub min_sdk: Vec<String>,
    #[serde(rename = "nativeLibraries", default)]
    pub native_libraries: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub queries: Vec<String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub xmls: Vec<String>,

    /// permission -> attribute -> value, unconditionally declared.
    #[serde(rename = "permissionConstraints", default)]
    pub permission_constraints: HashMap<String, HashMap<String, serde_json::Value>>,

    #[serde(default)]
    pub conditionals: Conditionals,
}

impl ComponentBuildInfo {
    /// Unconditional values declared for a category.
    pub fn category_values(&self, category: Category) -> &[String] {
        match category {
            Category::Assets => &self.assets,
            Category::Activities => &self.activities,
            Category::ActivityMetadata => &self.activity_metadata,
            Category::BroadcastReceivers => &self.broadcast_receivers,
            Category::ContentProviders => &self.content_providers,
            Category::Libraries => &self.libraries,
            Category::Metadata => &self.metadata,
            Category::MinSdk => &self.min_sdk,
            Category::NativeLibraries => &self.native_libraries,
            Category::Permissions => &self.permissions,
            Category::Queries => &self.queries,
            Category::Services => &self.services,
            Category::Xmls => &self.xmls,
        }
    }

    /// Conditional block map for a category, if any.
    pub fn conditional_values(&self, category: Category) -> Option<&HashMap<String, Vec<String>>> {
        self.conditionals.categories.get(category.field())
    }
}

/// Parse a JSON array of component build-info objects.
pub fn parse_build_info(json: &str) -> Result<Vec<ComponentBuildInfo>, ComponentError> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_arrays_default_to_empty() {
        let infos = parse_build_info(
            r#"[{"type": "com.blockforge.components.runtime.Label"}]"#,
        )
        .unwrap();
        assert_eq!(infos.len(), 1);
        assert!(infos[0].permissions.is_empty());
        assert!(infos[0].broadcast_receivers.is_empty());
        assert!(infos[0].conditionals.categories.is_empty());
    }

    #[test]
    fn conditionals_split_constraints_from_categories() {
        let infos = parse_build_info(
            r#"[{
                "type": "com.blockforge.components.runtime.Texting",
                "permissions": ["android.permission.INTERNET"],
                "conditionals": {
                    "permissions": {
                        "SendMessage": ["android.permission.SEND_SMS"]
                    },
                    "permissionConstraints": {
                        "SendMessage": {
                            "android.permission.SEND_SMS": {"maxSdkVersion": 29}
                        }
                    }
                }
            }]"#,
        )
        .unwrap();
        let info = &infos[0];
        let perms = info.conditional_values(Category::Permissions).unwrap();
        assert_eq!(perms["SendMessage"], vec!["android.permission.SEND_SMS"]);
        assert!(info.conditionals.permission_constraints["SendMessage"]
            .contains_key("android.permission.SEND_SMS"));
        // The constraints key must not leak into the category map
        assert!(!info.conditionals.categories.contains_key("permissionConstraints"));
    }

    #[test]
    fn malformed_json_is_fatal() {
        assert!(parse_build_info("[{").is_err());
    }
}
