use serde::{Deserialize, Serialize};
use serde_json::Value;

///
/// Events a client may send over the relay channel, as
/// `{"event": "<name>", "data": <payload>}` text frames
///
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    MyEvent(Value),
    MyBroadcastEvent(Value),
    RasaText(String),
    RasaVoice(String),
    Join(String),
    Leave(String),
    CloseRoom(String),
    MyRoomEvent(RoomMessage),
    DisconnectRequest,
    MyPing,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoomMessage {
    pub room: String,
    pub data: Value,
}

///
/// Events the server pushes to clients, serialized the same way
///
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    MyResponse(ResponseData),
    MyPong,
    RelayError(ErrorData),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseData {
    pub data: Value,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorData {
    pub error: String,
    pub count: u64,
}

impl ServerEvent {
    pub fn response(data: impl Into<Value>, count: u64) -> Self {
        ServerEvent::MyResponse(ResponseData { data: data.into(), count })
    }

    pub fn error(error: impl Into<String>, count: u64) -> Self {
        ServerEvent::RelayError(ErrorData { error: error.into(), count })
    }
}
