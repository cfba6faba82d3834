//! Cross-scenario recurring view.
//!
//! GET recurring reads the RecurringItem table through the UserEmailIndex,
//! so the principal sees every recurring item they own regardless of which
//! scenario partition it lives in. This bypasses partition scoping by
//! design; the index key is still the authenticated email, so per-user
//! isolation holds.

use serde_json::{json, Value};

use crate::api::format::{ApiResponse, ApiResult};
use crate::auth::Principal;
use crate::state::AppState;

pub async fn list_for_user(state: &AppState, principal: &Principal) -> ApiResult {
    let items = state.store.list_recurring_by_email(&principal.email).await?;
    let items: Vec<Value> = items.into_iter().map(Value::Object).collect();

    Ok(ApiResponse::success(json!({
        "items": items,
        "count": items.len(),
    })))
}
