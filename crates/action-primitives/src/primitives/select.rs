//! Select primitive - pick a dropdown option by value or visible text

use tracing::info;

use crate::{errors::ActionError, primitives::ActionCtx};

pub(crate) async fn execute_select(ctx: &ActionCtx<'_>) -> Result<Option<String>, ActionError> {
    let target = ctx.target()?;
    let option = ctx.value()?;
    info!(
        action_id = %ctx.request.action_id,
        target = %target,
        option,
        "Executing select primitive"
    );

    ctx.wait_interactable(target).await?;
    ctx.page.select_option(target, option).await?;
    Ok(None)
}
