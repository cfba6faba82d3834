//! Scenario index operations.

use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::format::{ApiResponse, ApiResult};
use crate::auth::Principal;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::ScenarioRow;

/// GET listScenarios - every Scenario row for the principal, in ordinal
/// order, each annotated with its `active` ordinal. Zero scenarios is an
/// empty list, not an error.
pub async fn list(state: &AppState, principal: &Principal) -> ApiResult {
    let rows = state.store.list_scenarios(&principal.email).await?;
    let scenarios: Vec<Value> = rows
        .iter()
        .map(|row| {
            json!({
                "scenarioId": row.scenario_id,
                "name": row.name,
                "active": row.active,
            })
        })
        .collect();

    Ok(ApiResponse::success(json!({
        "scenarios": scenarios,
        "count": scenarios.len(),
    })))
}

#[derive(Debug, Deserialize)]
struct AddScenarioBody {
    name: String,
}

/// POST addScenario - create a Scenario row owned by the principal. The
/// first scenario of a user gets ordinal 1 and is thereby the active plan.
/// There is no scenario deletion surface.
pub async fn add(state: &AppState, principal: &Principal, body: Value) -> ApiResult {
    let body: AddScenarioBody =
        serde_json::from_value(body).map_err(|e| ApiError::validation(e.to_string()))?;
    if body.name.trim().is_empty() {
        return Err(ApiError::validation_field("name", "name must not be empty"));
    }

    let row = ScenarioRow {
        email: principal.email.clone(),
        active: state.store.next_scenario_ordinal(&principal.email).await?,
        scenario_id: Uuid::new_v4().to_string(),
        name: body.name.trim().to_string(),
    };
    state.store.put_scenario(&row).await?;

    tracing::info!("Created scenario {} for {}", row.scenario_id, principal.email);

    Ok(ApiResponse::created(json!({
        "scenarioId": row.scenario_id,
        "name": row.name,
        "active": row.active,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{principal, test_state};
    use serde_json::json;

    #[tokio::test]
    async fn empty_listing_is_an_empty_sequence() {
        let state = test_state();
        let resp = list(&state, &principal("a@x.com")).await.unwrap();
        let data = serde_json::to_value(&resp.data).unwrap();
        assert_eq!(data["count"], 0);
        assert_eq!(data["scenarios"], json!([]));
    }

    #[tokio::test]
    async fn add_then_list_round_trips() {
        let state = test_state();
        let me = principal("a@x.com");

        let created = add(&state, &me, json!({"name": "Retirement"})).await.unwrap();
        let created = serde_json::to_value(&created.data).unwrap();
        assert_eq!(created["name"], "Retirement");
        assert_eq!(created["active"], 1);

        let listed = list(&state, &me).await.unwrap();
        let listed = serde_json::to_value(&listed.data).unwrap();
        assert_eq!(listed["count"], 1);
        assert_eq!(listed["scenarios"][0]["scenarioId"], created["scenarioId"]);

        // Second scenario gets the next ordinal.
        let second = add(&state, &me, json!({"name": "House"})).await.unwrap();
        let second = serde_json::to_value(&second.data).unwrap();
        assert_eq!(second["active"], 2);
    }

    #[tokio::test]
    async fn scenarios_are_not_visible_across_users() {
        let state = test_state();
        add(&state, &principal("a@x.com"), json!({"name": "Mine"})).await.unwrap();

        let other = list(&state, &principal("b@x.com")).await.unwrap();
        let other = serde_json::to_value(&other.data).unwrap();
        assert_eq!(other["count"], 0);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let state = test_state();
        let err = add(&state, &principal("a@x.com"), json!({"name": "  "}))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation { .. }));
    }
}
