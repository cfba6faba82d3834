//! Shared ownership guard and record shaping helpers.
//!
//! Centralizing the ownership check keeps the policy identical across record
//! types: a scenario that is absent or owned by someone else answers
//! `NotFound` either way, so callers cannot probe for existence.

use serde_json::Value;

use crate::auth::Principal;
use crate::error::ApiError;
use crate::records::RecordType;
use crate::store::scenario::{record_sort_key, scenario_data_id};
use crate::store::{Item, ScenarioRow, ScenarioStore};

/// Fields the store layer owns; callers can neither set nor patch them.
pub const SYSTEM_FIELDS: &[&str] = &[
    "id",
    "type",
    "scenarioDataId",
    "sk",
    "email",
    "scenarioId",
    "updatedAt",
];

/// Verify the scenario exists and belongs to the principal, returning its
/// row. Lookup is keyed by the principal's email, so a caller supplying
/// another user's scenarioId finds nothing.
pub async fn ensure_owned_scenario(
    store: &ScenarioStore,
    principal: &Principal,
    scenario_id: &str,
) -> Result<ScenarioRow, ApiError> {
    if scenario_id.trim().is_empty() {
        return Err(ApiError::validation_field(
            "scenarioId",
            "scenarioId must not be empty",
        ));
    }

    match store.find_scenario(&principal.email, scenario_id).await? {
        Some(row) => Ok(row),
        None => Err(ApiError::not_found("Scenario not found")),
    }
}

/// Partition key for the principal's scenario.
pub fn data_id_for(principal: &Principal, scenario_id: &str) -> String {
    scenario_data_id(&principal.email, scenario_id)
}

/// Sort key for one record. Settings is a per-scenario singleton.
pub fn sort_key_for(record_type: RecordType, item_id: &str) -> String {
    match record_type {
        RecordType::Settings => RecordType::Settings.as_str().to_string(),
        _ => record_sort_key(record_type.as_str(), item_id),
    }
}

/// Strip storage-internal keys before an item goes over the wire.
pub fn wire_record(mut item: Item) -> Value {
    item.remove("scenarioDataId");
    item.remove("sk");
    Value::Object(item)
}

/// Reject non-object patches and drop system fields a caller tried to smuggle
/// in, returning the remaining fields.
pub fn sanitize_patch(payload: Value) -> Result<Item, ApiError> {
    let Value::Object(mut map) = payload else {
        return Err(ApiError::validation("Request body must be a JSON object"));
    };
    for field in SYSTEM_FIELDS {
        map.remove(*field);
    }
    if map.is_empty() {
        return Err(ApiError::validation("Request body contains no updatable fields"));
    }
    Ok(map)
}
