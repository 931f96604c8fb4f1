//! Navigate primitive - load a URL into the session page

use tracing::{debug, info};
use url::Url;

use crate::{errors::ActionError, primitives::ActionCtx};

const ALLOWED_SCHEMES: [&str; 4] = ["http", "https", "file", "about"];

/// Check that `raw` is an absolute URL with a scheme the browser may load.
pub fn validate_url(raw: &str) -> Result<Url, ActionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ActionError::InvalidValue("URL cannot be empty".to_string()));
    }
    let url = Url::parse(trimmed)
        .map_err(|err| ActionError::InvalidValue(format!("'{trimmed}' is not a URL: {err}")))?;
    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return Err(ActionError::InvalidValue(format!(
            "Invalid URL scheme: {}",
            url.scheme()
        )));
    }
    Ok(url)
}

/// Execute navigate primitive
///
/// The step value is the URL. Waits for the page load to settle within the
/// step timeout.
pub(crate) async fn execute_navigate(ctx: &ActionCtx<'_>) -> Result<Option<String>, ActionError> {
    let url = validate_url(ctx.value()?)?;
    info!(action_id = %ctx.request.action_id, url = %url, "Executing navigate primitive");

    ctx.page.navigate(url.as_str(), ctx.remaining()).await?;

    debug!(action_id = %ctx.request.action_id, "Navigation settled");
    Ok(None)
}
