pub mod guard;
pub mod records;
pub mod recurring;
pub mod scenarios;
pub mod settings;

use serde_json::json;

use crate::api::format::{ApiResponse, ApiResult};

/// POST ping - health check, no auth, no store access.
pub fn ping() -> ApiResult {
    Ok(ApiResponse::success(json!({"status": "ok"})))
}
