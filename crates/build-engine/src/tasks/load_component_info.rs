//! LoadComponentInfo
//!
//! Resolves every manifest-artifact category for the project's used
//! component types, including the block-gated conditional merge. The
//! algorithm itself lives in `blockforge-components`; this task wires
//! it to the context.

use blockforge_components::ComponentInfoLoader;

use crate::context::CompilerContext;
use crate::BuildError;

pub async fn load_component_info(ctx: &mut CompilerContext) -> Result<(), BuildError> {
    let uses_location = ctx.project().map(|p| p.uses_location).unwrap_or(false);

    ComponentInfoLoader::new(ctx.build_info(), ctx.comp_types(), ctx.comp_blocks())
        .for_companion(ctx.for_companion())
        .uses_location(uses_location)
        .include_dangerous_permissions(ctx.include_dangerous_permissions())
        .load_all(ctx.component_info())?;

    Ok(())
}
