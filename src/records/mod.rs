//! Typed record payloads and their validation rules.
//!
//! Wire fields are camelCase. Each payload carries a `flatten`ed map so
//! additional fields pass through unvalidated, per the API contract.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Discriminator stored in the `type` attribute and encoded into the sort
/// key of every ScenarioData row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Asset,
    Recurring,
    OneTime,
    Settings,
}

impl RecordType {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::Asset => "Asset",
            RecordType::Recurring => "Recurring",
            RecordType::OneTime => "OneTime",
            RecordType::Settings => "Settings",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ApiError> {
        match value {
            "Asset" => Ok(RecordType::Asset),
            "Recurring" => Ok(RecordType::Recurring),
            "OneTime" => Ok(RecordType::OneTime),
            "Settings" => Ok(RecordType::Settings),
            other => Err(ApiError::validation_field(
                "type",
                format!("Unknown record type '{}'", other),
            )),
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPayload {
    pub name: String,
    pub category: String,
    pub amount: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringPayload {
    pub name: String,
    pub frequency: Frequency,
    pub amount: f64,
    pub category: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneTimePayload {
    pub name: String,
    pub amount: f64,
    pub date: chrono::NaiveDate,
    pub category: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPayload {
    pub currency: String,
    /// Month the fiscal year starts in, 1-12.
    pub fiscal_year_start: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Validate a full payload of the given type and return it as a field map
/// ready for storage. Shape errors and range errors both surface as
/// `ValidationError` naming the offending field.
pub fn validate_payload(record_type: RecordType, payload: &Value) -> Result<Map<String, Value>, ApiError> {
    if !payload.is_object() {
        return Err(ApiError::validation("Request body must be a JSON object"));
    }

    match record_type {
        RecordType::Asset => {
            let parsed: AssetPayload = parse(payload)?;
            require_name(&parsed.name)?;
            require_non_empty("category", &parsed.category)?;
            require_amount(parsed.amount)?;
            to_map(&parsed)
        }
        RecordType::Recurring => {
            let parsed: RecurringPayload = parse(payload)?;
            require_name(&parsed.name)?;
            require_non_empty("category", &parsed.category)?;
            require_amount(parsed.amount)?;
            to_map(&parsed)
        }
        RecordType::OneTime => {
            let parsed: OneTimePayload = parse(payload)?;
            require_name(&parsed.name)?;
            require_non_empty("category", &parsed.category)?;
            require_amount(parsed.amount)?;
            to_map(&parsed)
        }
        RecordType::Settings => {
            let parsed: SettingsPayload = parse(payload)?;
            require_non_empty("currency", &parsed.currency)?;
            if !(1..=12).contains(&parsed.fiscal_year_start) {
                return Err(ApiError::validation_field(
                    "fiscalYearStart",
                    "fiscalYearStart must be between 1 and 12",
                ));
            }
            to_map(&parsed)
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(payload: &Value) -> Result<T, ApiError> {
    // serde's message names the missing or mistyped field.
    serde_json::from_value(payload.clone()).map_err(|e| ApiError::validation(e.to_string()))
}

fn to_map<T: Serialize>(parsed: &T) -> Result<Map<String, Value>, ApiError> {
    match serde_json::to_value(parsed)? {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::unexpected("payload did not serialize to an object")),
    }
}

fn require_name(name: &str) -> Result<(), ApiError> {
    require_non_empty("name", name)
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation_field(
            field,
            format!("{} must not be empty", field),
        ));
    }
    Ok(())
}

fn require_amount(amount: f64) -> Result<(), ApiError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ApiError::validation_field(
            "amount",
            "amount must be a non-negative number",
        ));
    }
    Ok(())
}
