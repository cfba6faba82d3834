//! Settings is a per-scenario singleton: fixed sort key, upsert on update.

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::format::{ApiResponse, ApiResult};
use crate::auth::Principal;
use crate::error::ApiError;
use crate::records::{validate_payload, RecordType};
use crate::state::AppState;

use super::guard::{data_id_for, ensure_owned_scenario, sanitize_patch, sort_key_for, wire_record};
use super::records::build_record;

/// GET getSettings - the Settings record for a scenario.
pub async fn get(state: &AppState, principal: &Principal, scenario_id: &str) -> ApiResult {
    super::records::get(state, principal, scenario_id, RecordType::Settings, None).await
}

/// PUT updateSettings - upsert. A scenario with no settings yet accepts a
/// full payload; an existing record takes a field-level patch.
pub async fn update(
    state: &AppState,
    principal: &Principal,
    scenario_id: &str,
    payload: Value,
) -> ApiResult {
    ensure_owned_scenario(&state.store, principal, scenario_id).await?;

    let data_id = data_id_for(principal, scenario_id);
    let sort_key = sort_key_for(RecordType::Settings, "");

    let existing = state.store.get_record(&data_id, &sort_key).await?;

    match existing {
        None => {
            let fields = validate_payload(RecordType::Settings, &payload)?;
            let item_id = Uuid::new_v4().to_string();
            let item = build_record(fields, &item_id, RecordType::Settings, &data_id, &sort_key);
            state.store.put_record(&data_id, &sort_key, item.clone()).await?;
            Ok(ApiResponse::created(wire_record(item)))
        }
        Some(existing) => {
            let mut patch = sanitize_patch(payload)?;

            let mut merged = existing;
            for (field, value) in &patch {
                merged.insert(field.clone(), value.clone());
            }
            validate_payload(RecordType::Settings, &Value::Object(merged))?;

            patch.insert("updatedAt".into(), json!(Utc::now().to_rfc3339()));
            let updated = state
                .store
                .update_record(&data_id, &sort_key, patch)
                .await?
                .ok_or_else(|| ApiError::not_found("Item not found"))?;
            Ok(ApiResponse::success(wire_record(updated)))
        }
    }
}
