/// Telegram chat id (numeric). Saved cities are keyed by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// WGS84 position in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A labelled point handed to the map renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct MapPoint {
    pub label: String,
    pub coords: Coordinates,
}

impl MapPoint {
    pub fn new(label: impl Into<String>, coords: Coordinates) -> Self {
        Self {
            label: label.into(),
            coords,
        }
    }
}
