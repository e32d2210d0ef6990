use std::sync::Arc;

use tracing::debug;

use crate::catalog::types::{Category, Component};
use crate::error::{EngineError, EngineResult};

use super::state::BuildState;

/// Replace the component in `category` with `component`.
///
/// Returns a new build; `build` itself is untouched and every other category
/// is carried over. The caller decides when to re-validate.
pub fn apply_swap(
    build: &BuildState,
    category: Category,
    component: impl Into<Arc<Component>>,
) -> EngineResult<BuildState> {
    let component = component.into();
    if component.category() != category {
        return Err(EngineError::Configuration(format!(
            "Cannot swap '{}' ({}) into the {} slot",
            component.id,
            component.category(),
            category
        )));
    }
    if category == Category::Storage {
        return Err(EngineError::Configuration(
            "Storage holds several drives; add or remove drives instead of swapping".to_string(),
        ));
    }
    debug!(
        "Swapping {} -> '{}' (was {:?})",
        category,
        component.id,
        build.part(category).map(|c| c.id.as_str())
    );
    build.select(component)
}
