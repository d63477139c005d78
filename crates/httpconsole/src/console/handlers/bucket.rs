//! Bucket handlers.

use crate::bucket::BucketEngine;
use crate::console::context::RequestContext;
use crate::console::types::{Outcome, Reply};
use crate::error::ConsoleError;
use hyper::header::LOCATION;
use hyper::StatusCode;
use serde_json::Value;

/// GET /bucket/create - placeholder for the creation form
pub fn handle_form() -> Result<Outcome, ConsoleError> {
    Ok(Reply::ok(Value::Null).view("bucket/create").into())
}

/// POST /bucket/create - validate and store a HAR response
pub async fn handle_create(
    ctx: &RequestContext,
    engine: &BucketEngine,
    public_port: u16,
) -> Result<Outcome, ConsoleError> {
    let id = engine.create(ctx.captured.body.json.as_ref()).await?;
    let url = format!("http://{}:{}/bucket/{}", ctx.hostname, public_port, id);

    Ok(Reply::new(StatusCode::CREATED, url.as_str())
        .header(LOCATION, &url)
        .into())
}

/// GET /bucket/:id/view - stored document, not replayed
pub async fn handle_view(engine: &BucketEngine, id: &str) -> Result<Outcome, ConsoleError> {
    let document = engine.view(id).await?;
    Ok(Reply::ok(document).view("bucket/view").into())
}

/// * /bucket/:id - replay the stored response and log the interaction
pub async fn handle_replay(
    ctx: &RequestContext,
    engine: &BucketEngine,
    id: &str,
) -> Result<Outcome, ConsoleError> {
    let response = engine.replay(id, &ctx.entry).await?;
    Ok(Outcome::Raw(response))
}

/// GET /bucket/:id/log - interaction log
pub async fn handle_log(engine: &BucketEngine, id: &str) -> Result<Outcome, ConsoleError> {
    let har = engine.log(id).await?;
    let body = serde_json::to_value(&har).map_err(|e| ConsoleError::Render(e.to_string()))?;
    Ok(Reply::ok(body).view("bucket/log").into())
}
