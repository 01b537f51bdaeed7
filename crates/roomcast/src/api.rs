//! Control-plane request and response bodies.
//!
//! Request fields are read leniently, the way browser clients tend to
//! send them: numbers may arrive as strings and booleans as `"true"`.

use roomcast_protocol::{JsonCodec, PublicRoom, RoomKey, Status};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ControlError;

/// Body of `POST /api/room`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateRoomRequest {
    #[serde(default)]
    pub game: Option<Value>,
    #[serde(default)]
    pub version: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub limit: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl CreateRoomRequest {
    /// The room triple. Every part must be present and non-empty.
    pub fn key(&self) -> Result<RoomKey, ControlError> {
        match (text(&self.game), text(&self.version), text(&self.name)) {
            (Some(game), Some(version), Some(name)) => Ok(RoomKey::new(game, version, name)),
            _ => Err(ControlError::MissingParameters),
        }
    }

    /// The peer limit; 0 when absent or unusable.
    pub fn limit(&self) -> usize {
        self.limit.as_ref().map_or(0, parse_limit)
    }

    /// Initial metadata. Defaults to an empty object.
    pub fn metadata(&self) -> Result<Map<String, Value>, ControlError> {
        match &self.data {
            None | Some(Value::Null) => Ok(Map::new()),
            Some(value) => object(value.clone()),
        }
    }
}

/// Body of `POST /api/room/data/:uid`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateDataRequest {
    #[serde(default)]
    pub merge: Value,
    #[serde(default)]
    pub data: Option<Value>,
}

impl UpdateDataRequest {
    pub fn merge(&self) -> bool {
        flag(&self.merge)
    }

    pub fn patch(&self) -> Result<Map<String, Value>, ControlError> {
        match &self.data {
            Some(value) => object(value.clone()),
            None => Err(ControlError::InvalidData("missing data".into())),
        }
    }
}

/// Body of `POST /api/room/close/:uid`. A missing `close` reopens.
#[derive(Debug, Default, Deserialize)]
pub struct CloseRequest {
    #[serde(default)]
    pub close: Value,
}

impl CloseRequest {
    pub fn close(&self) -> bool {
        flag(&self.close)
    }
}

/// `{status, data: PublicRoom}`
#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub status: Status,
    pub data: PublicRoom,
}

impl RoomResponse {
    pub fn success(data: PublicRoom) -> Self {
        Self {
            status: Status::Success,
            data,
        }
    }
}

/// `{status, servers: [PublicRoom]}`
#[derive(Debug, Serialize)]
pub struct RoomListResponse {
    pub status: Status,
    pub servers: Vec<PublicRoom>,
}

/// `{status, data: metadata}`
#[derive(Debug, Serialize)]
pub struct MetadataResponse {
    pub status: Status,
    pub data: Map<String, Value>,
}

fn text(value: &Option<Value>) -> Option<String> {
    let text = match value.as_ref()? {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Truthiness of a boolean-ish field: `true`, `"true"` or a non-zero
/// number.
fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

/// Reads a limit from a number or from the leading integer of a string
/// (`"4 players"` is 4). Negative or unparseable values mean unlimited.
fn parse_limit(value: &Value) -> usize {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                usize::try_from(u).unwrap_or(usize::MAX)
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 1.0)
                    .map_or(0, |f| f as usize)
            }
        }
        Value::String(s) => leading_integer(s).unwrap_or(0),
        _ => 0,
    }
}

fn leading_integer(s: &str) -> Option<usize> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    if negative {
        return Some(0);
    }
    Some(digits[..end].parse().unwrap_or(usize::MAX))
}

fn object(value: Value) -> Result<Map<String, Value>, ControlError> {
    Ok(JsonCodec.expect_object(value)?)
}
