//! Wait primitive
//!
//! With a target the resolved element is the satisfied condition. Without one
//! the step value is a duration, capped by the step timeout.

use tokio::time::sleep;
use tracing::{debug, info};

use crate::{errors::ActionError, primitives::ActionCtx, waiting::parse_wait_duration};

pub(crate) async fn execute_wait(ctx: &ActionCtx<'_>) -> Result<Option<String>, ActionError> {
    if let Some(target) = &ctx.request.target {
        debug!(action_id = %ctx.request.action_id, target = %target, "Wait condition already met");
        return Ok(None);
    }

    let requested = parse_wait_duration(ctx.value()?)?;
    let pause = requested.min(ctx.remaining());
    info!(
        action_id = %ctx.request.action_id,
        requested_ms = requested.as_millis() as u64,
        pause_ms = pause.as_millis() as u64,
        "Executing wait primitive"
    );
    sleep(pause).await;
    Ok(None)
}
