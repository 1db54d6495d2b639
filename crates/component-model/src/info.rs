//! Accumulated Component Info
//!
//! One populate-once map per artifact category, keyed by fully-qualified
//! component type. Population is guarded so that concurrent builds
//! sharing memoized structures apply each category at most once per type
//! (first-writer-wins); later refinement goes through explicit merges.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use parking_lot::Mutex;
use tracing::debug;

use crate::build_info::Category;

type CategoryMap = HashMap<String, BTreeSet<String>>;
/// type -> permission -> attribute -> value
type ConstraintMap = HashMap<String, HashMap<String, BTreeMap<String, String>>>;

/// Per-type manifest-artifact sets accumulated by the pipeline.
#[derive(Default)]
pub struct ComponentInfo {
    maps: HashMap<Category, Mutex<CategoryMap>>,
    unique_libs_needed: Mutex<BTreeSet<String>>,
    exploded_aar_res_dirs: Mutex<Vec<PathBuf>>,
    permission_constraints: Mutex<ConstraintMap>,
}

impl ComponentInfo {
    pub fn new() -> Self {
        let mut maps = HashMap::new();
        for category in Category::ALL {
            maps.insert(category, Mutex::new(CategoryMap::new()));
        }
        Self {
            maps,
            ..Default::default()
        }
    }

    fn map(&self, category: Category) -> &Mutex<CategoryMap> {
        // All categories are inserted in new(); a miss is a programming error.
        &self.maps[&category]
    }

    /// Record the unconditional values for a type. First writer wins:
    /// returns false (and changes nothing) when the type already has an
    /// entry for this category.
    pub fn populate_once(&self, category: Category, component_type: &str, values: BTreeSet<String>) -> bool {
        let mut map = self.map(category).lock();
        if map.get(component_type).map(|v| !v.is_empty()).unwrap_or(false) {
            debug!("{} already populated for {}", category.field(), component_type);
            return false;
        }
        map.insert(component_type.to_string(), values);
        true
    }

    /// Union additional values into a type's set, creating it if absent.
    pub fn merge_into<I, S>(&self, category: Category, component_type: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = self.map(category).lock();
        let entry = map.entry(component_type.to_string()).or_default();
        entry.extend(values.into_iter().map(Into::into));
    }

    /// Drop values failing the predicate from every type's set.
    pub fn retain_values(&self, category: Category, mut keep: impl FnMut(&str) -> bool) {
        let mut map = self.map(category).lock();
        for values in map.values_mut() {
            values.retain(|v| keep(v));
        }
    }

    pub fn get(&self, category: Category, component_type: &str) -> Option<BTreeSet<String>> {
        self.map(category).lock().get(component_type).cloned()
    }

    /// Snapshot of the whole category map.
    pub fn snapshot(&self, category: Category) -> CategoryMap {
        self.map(category).lock().clone()
    }

    /// Every value in the category, flattened across types.
    pub fn all_values(&self, category: Category) -> BTreeSet<String> {
        self.map(category)
            .lock()
            .values()
            .flat_map(|v| v.iter().cloned())
            .collect()
    }

    /// Highest declared component min-SDK, if any declares one.
    pub fn min_sdk_aggregate(&self) -> Option<u32> {
        self.all_values(Category::MinSdk)
            .iter()
            .filter_map(|v| v.trim().parse::<u32>().ok())
            .max()
    }

    pub fn add_unique_libs<I, S>(&self, libs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_libs_needed.lock().extend(libs.into_iter().map(Into::into));
    }

    pub fn unique_libs_needed(&self) -> BTreeSet<String> {
        self.unique_libs_needed.lock().clone()
    }

    /// Res dirs from exploded AAR dependencies, consumed by MergeResources.
    pub fn add_exploded_res_dir(&self, dir: PathBuf) {
        self.exploded_aar_res_dirs.lock().push(dir);
    }

    pub fn exploded_res_dirs(&self) -> Vec<PathBuf> {
        self.exploded_aar_res_dirs.lock().clone()
    }

    /// Record constraint attributes for one permission of one type,
    /// merging attribute maps per permission.
    pub fn add_permission_constraints(
        &self,
        component_type: &str,
        permission: &str,
        attrs: impl IntoIterator<Item = (String, String)>,
    ) {
        let mut map = self.permission_constraints.lock();
        map.entry(component_type.to_string())
            .or_default()
            .entry(permission.to_string())
            .or_default()
            .extend(attrs);
    }

    pub fn permission_constraints(&self) -> ConstraintMap {
        self.permission_constraints.lock().clone()
    }

    /// Constraint attributes for a permission, merged across all types.
    /// Types are visited in sorted order, so when two types disagree on
    /// an attribute the lexicographically last type wins and the result
    /// is stable across runs.
    pub fn constraints_for(&self, permission: &str) -> BTreeMap<String, String> {
        let map = self.permission_constraints.lock();
        let mut types: Vec<&String> = map.keys().collect();
        types.sort();
        let mut merged = BTreeMap::new();
        for component_type in types {
            if let Some(attrs) = map[component_type].get(permission) {
                merged.extend(attrs.clone());
            }
        }
        merged
    }
}
