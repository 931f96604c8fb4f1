//! Assert primitive - target text must contain the step value

use tracing::info;

use crate::{errors::ActionError, primitives::ActionCtx};

/// Without a value, existence of the target (already guaranteed by
/// resolution) passes.
pub(crate) async fn execute_assert(ctx: &ActionCtx<'_>) -> Result<Option<String>, ActionError> {
    let target = ctx.target()?;
    let Some(expected) = ctx.request.value.as_deref() else {
        info!(action_id = %ctx.request.action_id, target = %target, "Existence assertion passed");
        return Ok(None);
    };

    let actual = ctx.page.read_text(target).await?.unwrap_or_default();
    if actual.contains(expected) {
        info!(action_id = %ctx.request.action_id, target = %target, "Text assertion passed");
        Ok(None)
    } else {
        Err(ActionError::AssertionFailed {
            expected: expected.to_string(),
            actual,
        })
    }
}
