//! Controller event schema: validation and normalization.
//!
//! [`ControllerEvent::parse`] checks the recognised subset of fields and
//! keeps everything else in [`ControllerEvent::extra`], so re-serializing a
//! parsed event emits unknown fields unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{RelayError, ValidationError};

/// Event type assumed when the payload carries none.
pub const DEFAULT_EVENT_TYPE: &str = "xbox_input";

/// Event timestamp, normalized to a JSON number at validation time.
///
/// Integers stay integers on the wire; numeric strings are converted once
/// here and never re-coerced downstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Timestamp(Number);

/// Timestamp as it may appear in an inbound payload.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Number(Number),
    Text(String),
}

impl RawTimestamp {
    fn normalize(self) -> Option<Timestamp> {
        match self {
            Self::Number(n) => Some(Timestamp(n)),
            Self::Text(s) => {
                let s = s.trim();
                if let Ok(n) = s.parse::<u64>() {
                    Some(Timestamp(n.into()))
                } else if let Ok(n) = s.parse::<i64>() {
                    Some(Timestamp(n.into()))
                } else {
                    s.parse::<f64>()
                        .ok()
                        .and_then(Number::from_f64)
                        .map(Timestamp)
                }
            }
        }
    }
}

impl Timestamp {
    /// Accepts a JSON number or a string holding a finite number.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for any other value.
    pub fn coerce(value: Value) -> Result<Self, ValidationError> {
        serde_json::from_value::<RawTimestamp>(value)
            .ok()
            .and_then(RawTimestamp::normalize)
            .ok_or_else(|| ValidationError::invalid("timestamp", "number or numeric string"))
    }

    /// Timestamp as a float.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.0.as_f64().unwrap_or_default()
    }

    /// Underlying JSON number.
    #[must_use]
    pub const fn as_number(&self) -> &Number {
        &self.0
    }
}

/// Controller identifier, either form accepted as sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ControllerId {
    /// String identifier.
    Text(String),
    /// Numeric identifier.
    Number(Number),
}

/// Name → value mapping used for axes and buttons.
pub type InputMap = BTreeMap<String, Number>;

/// A validated controller event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerEvent {
    /// Event type, defaults to [`DEFAULT_EVENT_TYPE`].
    #[serde(rename = "type")]
    pub event_type: String,
    /// Normalized timestamp.
    pub timestamp: Timestamp,
    /// Optional controller identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_id: Option<ControllerId>,
    /// Optional axis values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axes: Option<InputMap>,
    /// Optional button values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buttons: Option<InputMap>,
    /// Unrecognised fields, re-emitted verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ControllerEvent {
    /// Validates a parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the value is not an object, when
    /// `timestamp` is missing, or when a recognised field has the wrong
    /// type.
    pub fn parse(value: Value) -> Result<Self, ValidationError> {
        let Value::Object(mut fields) = value else {
            return Err(ValidationError::new("event must be a JSON object"));
        };

        let event_type = match fields.remove("type") {
            None => DEFAULT_EVENT_TYPE.to_string(),
            Some(Value::String(s)) => s,
            Some(_) => return Err(ValidationError::invalid("type", "string")),
        };

        let timestamp = fields
            .remove("timestamp")
            .ok_or_else(|| ValidationError::missing("timestamp"))
            .and_then(Timestamp::coerce)?;

        let controller_id = match fields.remove("controller_id") {
            None => None,
            Some(Value::String(s)) => Some(ControllerId::Text(s)),
            Some(Value::Number(n)) => Some(ControllerId::Number(n)),
            Some(_) => {
                return Err(ValidationError::invalid(
                    "controller_id",
                    "string or number",
                ));
            }
        };

        let axes = fields
            .remove("axes")
            .map(|v| parse_input_map("axes", v))
            .transpose()?;
        let buttons = fields
            .remove("buttons")
            .map(|v| parse_input_map("buttons", v))
            .transpose()?;

        Ok(Self {
            event_type,
            timestamp,
            controller_id,
            axes,
            buttons,
            extra: fields,
        })
    }

    /// Parses and validates raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MalformedMessage`] if the bytes are not JSON and
    /// [`RelayError::Validation`] if the schema check fails.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RelayError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| RelayError::MalformedMessage(e.to_string()))?;
        Ok(Self::parse(value)?)
    }
}

fn parse_input_map(field: &str, value: Value) -> Result<InputMap, ValidationError> {
    let Value::Object(entries) = value else {
        return Err(ValidationError::invalid(field, "object of numbers"));
    };
    entries
        .into_iter()
        .map(|(name, v)| match v {
            Value::Number(n) => Ok((name, n)),
            _ => Err(ValidationError::invalid(&format!("{field}.{name}"), "number")),
        })
        .collect()
}
