//! The record handler family: list/get/add/update/delete for the typed
//! ScenarioData records. Every operation follows the same shape: derive the
//! partition key, check ownership through the shared guard, validate, then
//! hit the store with the type discriminator.

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::format::{ApiResponse, ApiResult};
use crate::auth::Principal;
use crate::error::ApiError;
use crate::records::{validate_payload, RecordType};
use crate::state::AppState;
use crate::store::scenario::record_sort_prefix;
use crate::store::Item;

use super::guard::{data_id_for, ensure_owned_scenario, sanitize_patch, sort_key_for, wire_record};

/// GET listAssets / listRecurring / listOneTime - all records of one type in
/// a scenario, in stable sort-key order.
pub async fn list(
    state: &AppState,
    principal: &Principal,
    scenario_id: &str,
    record_type: RecordType,
) -> ApiResult {
    ensure_owned_scenario(&state.store, principal, scenario_id).await?;

    let data_id = data_id_for(principal, scenario_id);
    let prefix = record_sort_prefix(record_type.as_str());
    let items = state.store.query_records(&data_id, &prefix).await?;

    let items: Vec<Value> = items.into_iter().map(wire_record).collect();
    Ok(ApiResponse::success(json!({
        "items": items,
        "count": items.len(),
    })))
}

/// GET getScenarioData - one record by type and id (Settings needs no id).
pub async fn get(
    state: &AppState,
    principal: &Principal,
    scenario_id: &str,
    record_type: RecordType,
    item_id: Option<&str>,
) -> ApiResult {
    ensure_owned_scenario(&state.store, principal, scenario_id).await?;

    let data_id = data_id_for(principal, scenario_id);
    let sort_key = sort_key_for(record_type, item_id.unwrap_or_default());
    let item = state
        .store
        .get_record(&data_id, &sort_key)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;

    Ok(ApiResponse::success(wire_record(item)))
}

/// POST addAsset / addRecurring / addOneTime - validate and create a record.
/// Recurring records are mirrored into the RecurringItem table to feed the
/// cross-scenario view.
pub async fn add(
    state: &AppState,
    principal: &Principal,
    scenario_id: &str,
    record_type: RecordType,
    payload: Value,
) -> ApiResult {
    ensure_owned_scenario(&state.store, principal, scenario_id).await?;

    let fields = validate_payload(record_type, &payload)?;
    let item_id = Uuid::new_v4().to_string();
    let data_id = data_id_for(principal, scenario_id);
    let sort_key = sort_key_for(record_type, &item_id);

    let item = build_record(fields.clone(), &item_id, record_type, &data_id, &sort_key);
    state.store.put_record(&data_id, &sort_key, item.clone()).await?;

    if record_type == RecordType::Recurring {
        let mirror = build_recurring_mirror(fields, &item_id, principal, scenario_id);
        state.store.put_recurring_item(&item_id, mirror).await?;
    }

    Ok(ApiResponse::created(wire_record(item)))
}

/// PUT updateAsset / updateRecurring / updateOneTime - field-level partial
/// update. The merged result must still validate as a full payload; the
/// store write only carries the patched fields, so two concurrent updates to
/// different fields do not clobber each other.
pub async fn update(
    state: &AppState,
    principal: &Principal,
    scenario_id: &str,
    record_type: RecordType,
    item_id: &str,
    payload: Value,
) -> ApiResult {
    ensure_owned_scenario(&state.store, principal, scenario_id).await?;

    let data_id = data_id_for(principal, scenario_id);
    let sort_key = sort_key_for(record_type, item_id);

    let existing = state
        .store
        .get_record(&data_id, &sort_key)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;

    let mut patch = sanitize_patch(payload)?;

    let mut merged = existing;
    for (field, value) in &patch {
        merged.insert(field.clone(), value.clone());
    }
    validate_payload(record_type, &Value::Object(merged))?;

    patch.insert("updatedAt".into(), json!(Utc::now().to_rfc3339()));
    let updated = state
        .store
        .update_record(&data_id, &sort_key, patch.clone())
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;

    if record_type == RecordType::Recurring {
        // Mirror may be missing if a past delete half-failed; that is fine.
        state.store.update_recurring_item(item_id, patch).await?;
    }

    Ok(ApiResponse::success(wire_record(updated)))
}

/// DELETE deleteAsset / deleteRecurring / deleteOneTime. Deleting an item
/// that is already gone answers NotFound, never an internal error.
pub async fn remove(
    state: &AppState,
    principal: &Principal,
    scenario_id: &str,
    record_type: RecordType,
    item_id: &str,
) -> ApiResult {
    ensure_owned_scenario(&state.store, principal, scenario_id).await?;

    let data_id = data_id_for(principal, scenario_id);
    let sort_key = sort_key_for(record_type, item_id);

    let deleted = state.store.delete_record(&data_id, &sort_key).await?;
    if !deleted {
        return Err(ApiError::not_found("Item not found"));
    }

    if record_type == RecordType::Recurring {
        state.store.delete_recurring_item(item_id).await?;
    }

    Ok(ApiResponse::success(json!({
        "deleted": true,
        "id": item_id,
    })))
}

pub(super) fn build_record(
    mut fields: Item,
    item_id: &str,
    record_type: RecordType,
    data_id: &str,
    sort_key: &str,
) -> Item {
    fields.insert("id".into(), json!(item_id));
    fields.insert("type".into(), json!(record_type.as_str()));
    fields.insert("scenarioDataId".into(), json!(data_id));
    fields.insert("sk".into(), json!(sort_key));
    fields.insert("updatedAt".into(), json!(Utc::now().to_rfc3339()));
    fields
}

fn build_recurring_mirror(
    mut fields: Item,
    item_id: &str,
    principal: &Principal,
    scenario_id: &str,
) -> Item {
    fields.insert("id".into(), json!(item_id));
    fields.insert("email".into(), json!(principal.email));
    fields.insert("scenarioId".into(), json!(scenario_id));
    fields.insert("type".into(), json!(RecordType::Recurring.as_str()));
    fields
}
