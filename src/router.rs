//! Single physical entry point, many logical operations.
//!
//! The service exposes one axum route matching any method on `/:op`. The
//! (verb, operation) pair resolves through the `ROUTE_TABLE` into a [`Route`]
//! variant, verification runs for everything except `ping`, and the variant
//! dispatches to its handler. Adding an operation is one table row plus one
//! match arm; the compiler keeps the match exhaustive.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::Value;

use crate::api::format::ApiResponse;
use crate::auth::{bearer_token, Principal};
use crate::error::ApiError;
use crate::handlers;
use crate::records::RecordType;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Ping,
    ListScenarios,
    AddScenario,
    GetScenarioData,
    ListAssets,
    ListRecurring,
    ListOneTime,
    GetSettings,
    AddAsset,
    AddRecurring,
    AddOneTime,
    UpdateAsset,
    UpdateRecurring,
    UpdateOneTime,
    UpdateSettings,
    DeleteAsset,
    DeleteRecurring,
    DeleteOneTime,
    Recurring,
}

/// The complete route table. Everything not listed here is a 404.
static ROUTE_TABLE: &[(Method, &str, Route)] = &[
    (Method::POST, "ping", Route::Ping),
    (Method::GET, "listScenarios", Route::ListScenarios),
    (Method::POST, "addScenario", Route::AddScenario),
    (Method::GET, "getScenarioData", Route::GetScenarioData),
    (Method::GET, "listAssets", Route::ListAssets),
    (Method::GET, "listRecurring", Route::ListRecurring),
    (Method::GET, "listOneTime", Route::ListOneTime),
    (Method::GET, "getSettings", Route::GetSettings),
    (Method::POST, "addAsset", Route::AddAsset),
    (Method::POST, "addRecurring", Route::AddRecurring),
    (Method::POST, "addOneTime", Route::AddOneTime),
    (Method::PUT, "updateAsset", Route::UpdateAsset),
    (Method::PUT, "updateRecurring", Route::UpdateRecurring),
    (Method::PUT, "updateOneTime", Route::UpdateOneTime),
    (Method::PUT, "updateSettings", Route::UpdateSettings),
    (Method::DELETE, "deleteAsset", Route::DeleteAsset),
    (Method::DELETE, "deleteRecurring", Route::DeleteRecurring),
    (Method::DELETE, "deleteOneTime", Route::DeleteOneTime),
    (Method::GET, "recurring", Route::Recurring),
];

impl Route {
    pub fn resolve(method: &Method, operation: &str) -> Option<Route> {
        ROUTE_TABLE
            .iter()
            .find(|(m, op, _)| m == method && *op == operation)
            .map(|(_, _, route)| *route)
    }

    /// `ping` is the only operation that runs without a verified principal.
    pub fn requires_auth(self) -> bool {
        !matches!(self, Route::Ping)
    }
}

/// Query-string parameters shared by the record operations.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpParams {
    pub scenario_id: Option<String>,
    pub item_id: Option<String>,
    #[serde(rename = "type")]
    pub record_type: Option<String>,
}

impl OpParams {
    fn scenario_id(&self) -> Result<&str, ApiError> {
        self.scenario_id
            .as_deref()
            .ok_or_else(|| ApiError::validation_field("scenarioId", "scenarioId is required"))
    }

    fn item_id(&self) -> Result<&str, ApiError> {
        self.item_id
            .as_deref()
            .ok_or_else(|| ApiError::validation_field("itemId", "itemId is required"))
    }
}

pub async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    Path(operation): Path<String>,
    Query(params): Query<OpParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match dispatch_inner(&state, &method, &operation, &params, &headers, &body).await {
        Ok(response) => response.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn dispatch_inner(
    state: &AppState,
    method: &Method,
    operation: &str,
    params: &OpParams,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<ApiResponse<Value>, ApiError> {
    let route = Route::resolve(method, operation).ok_or_else(|| {
        ApiError::not_found(format!("No operation {} {}", method, operation))
    })?;

    // Verification short-circuits before any handler runs.
    let principal = if route.requires_auth() {
        let token = bearer_token(headers)?;
        Some(state.verifier.verify(&token).await?)
    } else {
        None
    };

    match route {
        Route::Ping => handlers::ping(),
        route => {
            // requires_auth held above, so the principal is present.
            let principal = principal
                .ok_or_else(|| ApiError::unexpected("principal missing after verification"))?;
            dispatch_authenticated(state, route, &principal, params, body).await
        }
    }
}

async fn dispatch_authenticated(
    state: &AppState,
    route: Route,
    principal: &Principal,
    params: &OpParams,
    body: &Bytes,
) -> Result<ApiResponse<Value>, ApiError> {
    match route {
        Route::Ping => handlers::ping(),

        Route::ListScenarios => handlers::scenarios::list(state, principal).await,
        Route::AddScenario => {
            handlers::scenarios::add(state, principal, parse_body(body)?).await
        }

        Route::GetScenarioData => {
            let record_type = params
                .record_type
                .as_deref()
                .ok_or_else(|| ApiError::validation_field("type", "type is required"))?;
            let record_type = RecordType::parse(record_type)?;
            let item_id = match record_type {
                RecordType::Settings => None,
                _ => Some(params.item_id()?),
            };
            handlers::records::get(state, principal, params.scenario_id()?, record_type, item_id)
                .await
        }

        Route::ListAssets => {
            handlers::records::list(state, principal, params.scenario_id()?, RecordType::Asset)
                .await
        }
        Route::ListRecurring => {
            handlers::records::list(state, principal, params.scenario_id()?, RecordType::Recurring)
                .await
        }
        Route::ListOneTime => {
            handlers::records::list(state, principal, params.scenario_id()?, RecordType::OneTime)
                .await
        }

        Route::AddAsset => {
            handlers::records::add(
                state,
                principal,
                params.scenario_id()?,
                RecordType::Asset,
                parse_body(body)?,
            )
            .await
        }
        Route::AddRecurring => {
            handlers::records::add(
                state,
                principal,
                params.scenario_id()?,
                RecordType::Recurring,
                parse_body(body)?,
            )
            .await
        }
        Route::AddOneTime => {
            handlers::records::add(
                state,
                principal,
                params.scenario_id()?,
                RecordType::OneTime,
                parse_body(body)?,
            )
            .await
        }

        Route::UpdateAsset => {
            handlers::records::update(
                state,
                principal,
                params.scenario_id()?,
                RecordType::Asset,
                params.item_id()?,
                parse_body(body)?,
            )
            .await
        }
        Route::UpdateRecurring => {
            handlers::records::update(
                state,
                principal,
                params.scenario_id()?,
                RecordType::Recurring,
                params.item_id()?,
                parse_body(body)?,
            )
            .await
        }
        Route::UpdateOneTime => {
            handlers::records::update(
                state,
                principal,
                params.scenario_id()?,
                RecordType::OneTime,
                params.item_id()?,
                parse_body(body)?,
            )
            .await
        }

        Route::GetSettings => {
            handlers::settings::get(state, principal, params.scenario_id()?).await
        }
        Route::UpdateSettings => {
            handlers::settings::update(state, principal, params.scenario_id()?, parse_body(body)?)
                .await
        }

        Route::DeleteAsset => {
            handlers::records::remove(
                state,
                principal,
                params.scenario_id()?,
                RecordType::Asset,
                params.item_id()?,
            )
            .await
        }
        Route::DeleteRecurring => {
            handlers::records::remove(
                state,
                principal,
                params.scenario_id()?,
                RecordType::Recurring,
                params.item_id()?,
            )
            .await
        }
        Route::DeleteOneTime => {
            handlers::records::remove(
                state,
                principal,
                params.scenario_id()?,
                RecordType::OneTime,
                params.item_id()?,
            )
            .await
        }

        Route::Recurring => handlers::recurring::list_for_user(state, principal).await,
    }
}

fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.is_empty() {
        return Err(ApiError::validation("Request body is required"));
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::validation(format!("Invalid JSON body: {}", e)))
}
