// Wire schema for readings and actuator commands
//
// Readings:  topic temperature_meter/<entity_id>,          payload {"temperature": <number>}
// Commands:  topic heating_system/<entity_id>/control,    payload {"action": "turn_on" | "turn_off"}

use crate::control::{Action, Command};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;


pub const READING_TOPIC_ROOT: &str = "temperature_meter";
pub const COMMAND_TOPIC_ROOT: &str = "heating_system";
pub const COMMAND_TOPIC_LEAF: &str = "control";

/// Topic level separator
pub const TOPIC_SEPARATOR: char = '/';

/// JSON field carrying the reading value
const TEMPERATURE_FIELD: &str = "temperature";

/// A decoded sensor reading
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub entity_id: String,
    pub value: f64,
}

/// Command payload as sent on the wire
#[derive(Debug, Deserialize)]
struct CommandPayload {
    action: Action,
}

/// Inbound/outbound decoding errors
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    UnexpectedTopic(String),
    InvalidEntityId(String),
    InvalidUtf8,
    InvalidJson(String),
    PayloadNotObject,
    MissingField(&'static str),
    NonNumericField(&'static str),
    NonFiniteValue,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnexpectedTopic(t) => write!(f, "unexpected topic '{}'", t),
            DecodeError::InvalidEntityId(id) => write!(f, "invalid entity id '{}'", id),
            DecodeError::InvalidUtf8 => write!(f, "payload is not valid UTF-8"),
            DecodeError::InvalidJson(e) => write!(f, "payload is not valid JSON: {}", e),
            DecodeError::PayloadNotObject => write!(f, "payload must be a JSON object"),
            DecodeError::MissingField(name) => write!(f, "payload is missing '{}'", name),
            DecodeError::NonNumericField(name) => write!(f, "'{}' must be a number", name),
            DecodeError::NonFiniteValue => write!(f, "value must be finite"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Characters that would split or wildcard a topic level on either transport
const RESERVED_ID_CHARS: &[char] = &[TOPIC_SEPARATOR, '.', '+', '#', '*', '>'];

/// Entity ids are a single non-empty topic level without whitespace
pub fn is_valid_entity_id(entity_id: &str) -> bool {
    !entity_id.is_empty()
        && !entity_id
            .chars()
            .any(|c| RESERVED_ID_CHARS.contains(&c) || c.is_whitespace())
}

fn check_entity_id(entity_id: &str) -> Result<(), DecodeError> {
    if is_valid_entity_id(entity_id) {
        Ok(())
    } else {
        Err(DecodeError::InvalidEntityId(entity_id.to_string()))
    }
}

/// Topic readings for `entity_id` are published on
pub fn reading_topic(entity_id: &str) -> String {
    format!("{}{}{}", READING_TOPIC_ROOT, TOPIC_SEPARATOR, entity_id)
}

/// Topic commands for `entity_id` are published on
pub fn command_topic(entity_id: &str) -> String {
    format!(
        "{root}{sep}{id}{sep}{leaf}",
        root = COMMAND_TOPIC_ROOT,
        sep = TOPIC_SEPARATOR,
        id = entity_id,
        leaf = COMMAND_TOPIC_LEAF
    )
}

/// Extract the entity id from `temperature_meter/<entity_id>`
pub fn parse_reading_topic(topic: &str) -> Result<&str, DecodeError> {
    let mut levels = topic.split(TOPIC_SEPARATOR);
    match (levels.next(), levels.next(), levels.next()) {
        (Some(READING_TOPIC_ROOT), Some(entity_id), None) => {
            check_entity_id(entity_id)?;
            Ok(entity_id)
        }
        _ => Err(DecodeError::UnexpectedTopic(topic.to_string())),
    }
}

/// Extract the entity id from `heating_system/<entity_id>/control`
pub fn parse_command_topic(topic: &str) -> Result<&str, DecodeError> {
    let mut levels = topic.split(TOPIC_SEPARATOR);
    match (levels.next(), levels.next(), levels.next(), levels.next()) {
        (Some(COMMAND_TOPIC_ROOT), Some(entity_id), Some(COMMAND_TOPIC_LEAF), None) => {
            check_entity_id(entity_id)?;
            Ok(entity_id)
        }
        _ => Err(DecodeError::UnexpectedTopic(topic.to_string())),
    }
}

fn parse_json(payload: &[u8]) -> Result<Value, DecodeError> {
    let text = std::str::from_utf8(payload).map_err(|_| DecodeError::InvalidUtf8)?;
    serde_json::from_str(text).map_err(|e| DecodeError::InvalidJson(e.to_string()))
}

/// Decode `{"temperature": <number>}`. Integers are accepted; other fields are ignored.
pub fn decode_reading_payload(payload: &[u8]) -> Result<f64, DecodeError> {
    let json = parse_json(payload)?;
    let object = json.as_object().ok_or(DecodeError::PayloadNotObject)?;
    let value = object
        .get(TEMPERATURE_FIELD)
        .ok_or(DecodeError::MissingField(TEMPERATURE_FIELD))?
        .as_f64()
        .ok_or(DecodeError::NonNumericField(TEMPERATURE_FIELD))?;

    if !value.is_finite() {
        return Err(DecodeError::NonFiniteValue);
    }
    Ok(value)
}

/// Decode a full inbound reading message
pub fn decode_reading(topic: &str, payload: &[u8]) -> Result<Reading, DecodeError> {
    let entity_id = parse_reading_topic(topic)?;
    let value = decode_reading_payload(payload)?;
    Ok(Reading {
        entity_id: entity_id.to_string(),
        value,
    })
}

/// Encode a reading as `(topic, payload)`
pub fn encode_reading(reading: &Reading) -> (String, Vec<u8>) {
    let payload = serde_json::json!({ TEMPERATURE_FIELD: reading.value });
    (reading_topic(&reading.entity_id), payload.to_string().into_bytes())
}

/// Encode a command as `(topic, payload)`
pub fn encode_command(command: &Command) -> (String, Vec<u8>) {
    let payload = serde_json::json!({ "action": command.action });
    (command_topic(&command.entity_id), payload.to_string().into_bytes())
}

/// Decode an outbound command message (used by actuator bindings)
pub fn decode_command(topic: &str, payload: &[u8]) -> Result<Command, DecodeError> {
    let entity_id = parse_command_topic(topic)?;
    let json = parse_json(payload)?;
    if !json.is_object() {
        return Err(DecodeError::PayloadNotObject);
    }
    if json.get("action").is_none() {
        return Err(DecodeError::MissingField("action"));
    }
    let parsed: CommandPayload =
        serde_json::from_value(json).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    Ok(Command::new(entity_id, parsed.action))
}
