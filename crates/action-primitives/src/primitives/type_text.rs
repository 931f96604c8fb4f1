//! Type primitive - replace the content of the resolved field

use tracing::info;

use crate::{errors::ActionError, primitives::ActionCtx};

/// Execute type primitive
///
/// Waits for the field to become interactable, clears it, then types the
/// step value. Typed text is never logged.
pub(crate) async fn execute_type(ctx: &ActionCtx<'_>) -> Result<Option<String>, ActionError> {
    let target = ctx.target()?;
    let text = ctx
        .request
        .value
        .as_deref()
        .ok_or_else(|| ActionError::InvalidValue("type requires text".to_string()))?;

    info!(
        action_id = %ctx.request.action_id,
        target = %target,
        chars = text.chars().count(),
        "Executing type primitive"
    );

    ctx.wait_interactable(target).await?;
    ctx.page.type_text(target, text).await?;
    Ok(None)
}
