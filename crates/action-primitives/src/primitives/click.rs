//! Click primitive - click the resolved target once it is interactable

use tracing::info;

use crate::{errors::ActionError, primitives::ActionCtx};

pub(crate) async fn execute_click(ctx: &ActionCtx<'_>) -> Result<Option<String>, ActionError> {
    let target = ctx.target()?;
    info!(action_id = %ctx.request.action_id, target = %target, "Executing click primitive");

    ctx.wait_interactable(target).await?;
    ctx.page.click(target).await?;
    Ok(None)
}
