//! The request handler: validate `name`, call upstream once, compose a reply

use serde_json::Value;

use super::request::InboundRequest;
use super::response::FunctionResponse;
use super::upstream::{Upstream, UpstreamError};
use crate::config::{ComposeMode, FunctionConfig};

pub const GREETING_PREFIX: &str = "Goodbye ";

pub const MISSING_NAME_MESSAGE: &str =
    "Please pass a name on the query string or in the request body";

/// Handle one invocation.
///
/// Without a `name` the reply is a 400 and upstream is never called.
/// Otherwise exactly one upstream call is made and its outcome decides
/// between a 200 greeting and a 502 that still names the caller.
pub async fn invoke(
    request: &InboundRequest,
    upstream: &dyn Upstream,
    function: &FunctionConfig,
) -> FunctionResponse {
    let Some(name) = request.name() else {
        return FunctionResponse::bad_request(MISSING_NAME_MESSAGE);
    };

    let outcome = upstream
        .fetch()
        .await
        .and_then(|body| compose(&body, function.compose, function.json_field.as_deref()));

    match outcome {
        Ok(data) => FunctionResponse::ok(format!("{GREETING_PREFIX}{name}{data}")),
        Err(err) => FunctionResponse::bad_gateway(format!(
            "{GREETING_PREFIX}{name}, but the upstream call failed: {err}"
        )),
    }
}

/// Turn the upstream body into the text appended after the name
fn compose(body: &[u8], mode: ComposeMode, field: Option<&str>) -> Result<String, UpstreamError> {
    match mode {
        ComposeMode::Text => Ok(String::from_utf8_lossy(body).into_owned()),
        ComposeMode::Json => {
            let doc: Value = serde_json::from_slice(body)
                .map_err(|e| UpstreamError::Decode(format!("invalid JSON: {e}")))?;
            let value = match field {
                Some(field) => doc
                    .get(field)
                    .ok_or_else(|| UpstreamError::Decode(format!("missing field '{field}'")))?,
                None => &doc,
            };
            Ok(match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        }
    }
}
