use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A playable item: identifier, source URI and free-form descriptive fields
/// (title, artist, artwork, ...) that the session layer may display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extras: Map<String, Value>,
}

impl MediaItem {
    pub fn new(id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            extras: Map::new(),
        }
    }

    /// Attach a descriptive field, replacing any previous value under `key`
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extras.get(key).and_then(Value::as_str)
    }
}

/// Repeat mode requested by the session layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepeatMode {
    #[default]
    None,
    One,
    All,
    Group,
}

impl RepeatMode {
    /// Only repeat-one changes how a same-id replay is loaded
    pub fn repeats_current(self) -> bool {
        matches!(self, RepeatMode::One)
    }
}

/// Shuffle mode requested by the session layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShuffleMode {
    #[default]
    None,
    All,
    Group,
}

impl ShuffleMode {
    pub fn is_enabled(self) -> bool {
        matches!(self, ShuffleMode::All)
    }
}
