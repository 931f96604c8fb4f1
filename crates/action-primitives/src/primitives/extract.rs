//! Extract primitive - read text or an attribute, no page side effect

use tracing::info;

use crate::{errors::ActionError, primitives::ActionCtx};

pub(crate) async fn execute_extract(ctx: &ActionCtx<'_>) -> Result<Option<String>, ActionError> {
    let target = ctx.target()?;
    let attribute = ctx
        .request
        .value
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    info!(
        action_id = %ctx.request.action_id,
        target = %target,
        attribute = attribute.unwrap_or("<text>"),
        "Executing extract primitive"
    );

    let extracted = match attribute {
        Some(name) => ctx
            .page
            .read_attribute(target, name)
            .await?
            .ok_or_else(|| ActionError::MissingAttribute(name.to_string()))?,
        None => ctx.page.read_text(target).await?.unwrap_or_default(),
    };
    Ok(Some(extracted))
}
