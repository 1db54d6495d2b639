//! GenerateManifest
//!
//! Writes AndroidManifest.xml from the merged per-component artifact
//! sets: permissions (with constraint attributes), activities, broadcast
//! receivers, services, content providers, queries, and metadata.
//!
//! Receiver and service declarations follow the component descriptor
//! convention `ClassName,action1,action2` — the class followed by the
//! intent-filter actions it handles.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use tracing::info;

use blockforge_components::Category;

use crate::context::CompilerContext;
use crate::project::DEFAULT_MIN_SDK;
use crate::BuildError;

pub async fn generate_manifest(ctx: &mut CompilerContext) -> Result<(), BuildError> {
    let xml = render_manifest(ctx)?;
    let path = ctx.paths().manifest_file();
    std::fs::write(&path, xml)?;
    info!("wrote {:?}", path);
    Ok(())
}

fn render_manifest(ctx: &CompilerContext) -> Result<String, BuildError> {
    let info = ctx.component_info();
    let project = ctx.project();
    let package = project.map(|p| p.package.as_str()).unwrap_or("com.blockforge.app");

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 4);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut manifest = BytesStart::new("manifest");
    manifest.push_attribute(("xmlns:android", "http://schemas.android.com/apk/res/android"));
    manifest.push_attribute(("package", package));
    if let Some(project) = project {
        manifest.push_attribute(("android:versionCode", project.version_code.to_string().as_str()));
        manifest.push_attribute(("android:versionName", project.version_name.as_str()));
    }
    writer.write_event(Event::Start(manifest))?;

    // Component min-SDK declarations raise the floor, never lower it
    let floor = project.and_then(|p| p.min_sdk).unwrap_or(DEFAULT_MIN_SDK);
    let min_sdk = info.min_sdk_aggregate().map_or(floor, |agg| agg.max(floor));
    let target_sdk = project.map(|p| p.target_sdk).unwrap_or(crate::project::DEFAULT_TARGET_SDK);
    let mut uses_sdk = BytesStart::new("uses-sdk");
    uses_sdk.push_attribute(("android:minSdkVersion", min_sdk.to_string().as_str()));
    uses_sdk.push_attribute(("android:targetSdkVersion", target_sdk.to_string().as_str()));
    writer.write_event(Event::Empty(uses_sdk))?;

    for permission in info.all_values(Category::Permissions) {
        let mut elem = BytesStart::new("uses-permission");
        elem.push_attribute(("android:name", permission.as_str()));
        for (attr, value) in info.constraints_for(&permission) {
            let qualified = format!("android:{}", attr);
            elem.push_attribute((qualified.as_str(), value.as_str()));
        }
        writer.write_event(Event::Empty(elem))?;
    }

    let queries = info.all_values(Category::Queries);
    if !queries.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("queries")))?;
        for query in queries {
            let mut elem = BytesStart::new("package");
            elem.push_attribute(("android:name", query.as_str()));
            writer.write_event(Event::Empty(elem))?;
        }
        writer.write_event(Event::End(BytesEnd::new("queries")))?;
    }

    let mut application = BytesStart::new("application");
    if let Some(project) = project {
        application.push_attribute(("android:label", project.label()));
    }
    application.push_attribute(("android:icon", "@drawable/ya"));
    writer.write_event(Event::Start(application))?;

    if let Some(project) = project {
        let main = project.main_activity();
        let mut activity = BytesStart::new("activity");
        activity.push_attribute(("android:name", main.as_str()));
        activity.push_attribute(("android:exported", "true"));
        writer.write_event(Event::Start(activity))?;
        writer.write_event(Event::Start(BytesStart::new("intent-filter")))?;
        let mut action = BytesStart::new("action");
        action.push_attribute(("android:name", "android.intent.action.MAIN"));
        writer.write_event(Event::Empty(action))?;
        let mut category = BytesStart::new("category");
        category.push_attribute(("android:name", "android.intent.category.LAUNCHER"));
        writer.write_event(Event::Empty(category))?;
        writer.write_event(Event::End(BytesEnd::new("intent-filter")))?;
        writer.write_event(Event::End(BytesEnd::new("activity")))?;
    }

    // Activity metadata stays scoped to the component that declared the
    // activity; types are walked in sorted order for stable output.
    let activities_by_type = info.snapshot(Category::Activities);
    let mut activity_types: Vec<&String> = activities_by_type.keys().collect();
    activity_types.sort();
    for component_type in activity_types {
        // "name=value" pairs
        let metadata: Vec<(String, String)> = info
            .get(Category::ActivityMetadata, component_type)
            .unwrap_or_default()
            .iter()
            .filter_map(|m| m.split_once('=').map(|(n, v)| (n.to_string(), v.to_string())))
            .collect();
        for activity in &activities_by_type[component_type] {
            let mut elem = BytesStart::new("activity");
            elem.push_attribute(("android:name", activity.as_str()));
            if metadata.is_empty() {
                writer.write_event(Event::Empty(elem))?;
            } else {
                writer.write_event(Event::Start(elem))?;
                for (name, value) in &metadata {
                    write_meta_data(&mut writer, name, value)?;
                }
                writer.write_event(Event::End(BytesEnd::new("activity")))?;
            }
        }
    }

    for declaration in info.all_values(Category::BroadcastReceivers) {
        write_component_with_actions(&mut writer, "receiver", &declaration)?;
    }

    for declaration in info.all_values(Category::Services) {
        write_component_with_actions(&mut writer, "service", &declaration)?;
    }

    for provider in info.all_values(Category::ContentProviders) {
        let mut elem = BytesStart::new("provider");
        elem.push_attribute(("android:name", provider.as_str()));
        let authority = format!("{}.{}", package, provider.rsplit('.').next().unwrap_or(&provider));
        elem.push_attribute(("android:authorities", authority.to_lowercase().as_str()));
        writer.write_event(Event::Empty(elem))?;
    }

    for entry in info.all_values(Category::Metadata) {
        if let Some((name, value)) = entry.split_once('=') {
            write_meta_data(&mut writer, name, value)?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("application")))?;
    writer.write_event(Event::End(BytesEnd::new("manifest")))?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| BuildError::Config(format!("manifest not UTF-8: {}", e)))
}

fn write_meta_data(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    value: &str,
) -> Result<(), quick_xml::Error> {
    let mut elem = BytesStart::new("meta-data");
    elem.push_attribute(("android:name", name));
    elem.push_attribute(("android:value", value));
    writer.write_event(Event::Empty(elem))
}

/// `ClassName,action1,action2,...` -> element with an intent filter.
fn write_component_with_actions(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    element: &str,
    declaration: &str,
) -> Result<(), quick_xml::Error> {
    let mut parts = declaration.split(',');
    let class = parts.next().unwrap_or(declaration).trim();
    let actions: Vec<&str> = parts.map(str::trim).filter(|a| !a.is_empty()).collect();

    let mut elem = BytesStart::new(element);
    elem.push_attribute(("android:name", class));
    if actions.is_empty() {
        writer.write_event(Event::Empty(elem))?;
        return Ok(());
    }

    elem.push_attribute(("android:exported", "true"));
    writer.write_event(Event::Start(elem))?;
    writer.write_event(Event::Start(BytesStart::new("intent-filter")))?;
    for action in actions {
        let mut elem = BytesStart::new("action");
        elem.push_attribute(("android:name", action));
        writer.write_event(Event::Empty(elem))?;
    }
    writer.write_event(Event::End(BytesEnd::new("intent-filter")))?;
    writer.write_event(Event::End(BytesEnd::new(element)))?;
    Ok(())
}
