use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::warn;

/// Current schema version written with every snapshot
pub const SCHEMA_VERSION: u64 = 1;

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One content fragment of a turn
///
/// Anything other than a bare `text`/`reasoning` fragment (tool calls,
/// sources, step markers, text with extra fields) is kept verbatim in
/// `Other` and written back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text { text: String },
    Reasoning { text: String },
    Other(Value),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    /// The fragment's `type` tag
    pub fn kind(&self) -> Option<&str> {
        match self {
            Part::Text { .. } => Some("text"),
            Part::Reasoning { .. } => Some("reasoning"),
            Part::Other(raw) => raw.get("type").and_then(Value::as_str),
        }
    }

    /// Text carried by a `text` fragment, in whichever form it was stored
    fn visible_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text.as_str()),
            Part::Reasoning { .. } => None,
            Part::Other(raw) if self.kind() == Some("text") => {
                raw.get("text").and_then(Value::as_str)
            }
            Part::Other(_) => None,
        }
    }

    fn from_value(raw: Value) -> Self {
        if let Some(obj) = raw.as_object() {
            let kind = obj.get("type").and_then(Value::as_str);
            let text = obj.get("text").and_then(Value::as_str);
            if obj.len() == 2 {
                match (kind, text) {
                    (Some("text"), Some(text)) => return Part::text(text),
                    (Some("reasoning"), Some(text)) => {
                        return Part::Reasoning {
                            text: text.to_string(),
                        }
                    }
                    _ => {}
                }
            }
        }
        Part::Other(raw)
    }
}

#[derive(Serialize)]
struct TaggedText<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

impl Serialize for Part {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Part::Text { text } => TaggedText {
                kind: "text",
                text: text.as_str(),
            }
            .serialize(serializer),
            Part::Reasoning { text } => TaggedText {
                kind: "reasoning",
                text: text.as_str(),
            }
            .serialize(serializer),
            Part::Other(raw) => raw.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Part {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Part::from_value)
    }
}

/// A single message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Opaque identifier, unique within a transcript
    pub id: String,

    pub role: Role,

    /// Content fragments in arrival order
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    /// Assistant turn with no content yet (streaming target)
    pub fn assistant(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            parts: Vec::new(),
        }
    }

    /// Synthetic greeting shown when a session starts with no history
    pub fn welcome(message: &str) -> Self {
        Self {
            id: format!("welcome-{}", chrono::Utc::now().timestamp_millis()),
            role: Role::Assistant,
            parts: vec![Part::text(message)],
        }
    }

    /// Concatenated text of all `text` parts
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::visible_text).collect()
    }

    /// Append streamed text, extending the trailing text part if there is one
    pub fn push_text(&mut self, delta: &str) {
        match self.parts.last_mut() {
            Some(Part::Text { text }) => text.push_str(delta),
            _ => self.parts.push(Part::text(delta)),
        }
    }
}

/// Elapsed generation time (ms) per turn id
pub type DurationMap = BTreeMap<String, f64>;

/// The transcript and duration map, as stored durably
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub messages: Vec<Turn>,
    #[serde(deserialize_with = "finite_durations")]
    pub durations: DurationMap,
}

/// Keep numeric entries only; a bad duration never costs the transcript
fn finite_durations<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DurationMap, D::Error> {
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(turn_id, value)| match value.as_f64() {
            Some(ms) if ms.is_finite() => Some((turn_id, ms)),
            _ => {
                warn!("Dropping unreadable duration for {}: {}", turn_id, value);
                None
            }
        })
        .collect())
}

impl Snapshot {
    pub fn new(messages: Vec<Turn>, durations: DurationMap) -> Self {
        Self {
            messages,
            durations,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.durations.is_empty()
    }

    /// Encode with the current schema version tag
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&PersistedSnapshot {
            version: SCHEMA_VERSION,
            messages: &self.messages,
            durations: self
                .durations
                .iter()
                .filter(|(_, ms)| ms.is_finite())
                .map(|(turn_id, ms)| (turn_id.as_str(), *ms))
                .collect(),
        })
    }

    /// Decode a stored document, upgrading older schema versions
    pub fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        let value: Value = serde_json::from_str(raw)?;
        let value = migrate(value)?;
        let snapshot: Snapshot = serde_json::from_value(value)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    fn validate(&self) -> Result<(), SnapshotError> {
        let mut seen = HashSet::with_capacity(self.messages.len());
        for turn in &self.messages {
            if !seen.insert(turn.id.as_str()) {
                return Err(SnapshotError::DuplicateTurnId(turn.id.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct PersistedSnapshot<'a> {
    version: u64,
    messages: &'a [Turn],
    durations: BTreeMap<&'a str, f64>,
}

/// Why a stored document could not be read
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("snapshot is not a JSON object")]
    NotAnObject,

    #[error("snapshot is missing field `{0}`")]
    MissingField(&'static str),

    #[error("snapshot schema version {0} is newer than supported version {max}", max = SCHEMA_VERSION)]
    UnsupportedVersion(u64),

    #[error("snapshot contains duplicate turn id `{0}`")]
    DuplicateTurnId(String),
}

/// Bring a stored document up to `SCHEMA_VERSION`
///
/// Documents written before versioning existed carry no `version` field and
/// are treated as schema 0.
fn migrate(mut value: Value) -> Result<Value, SnapshotError> {
    let version = match value.as_object() {
        Some(obj) => obj.get("version").and_then(Value::as_u64).unwrap_or(0),
        None => return Err(SnapshotError::NotAnObject),
    };

    if version > SCHEMA_VERSION {
        return Err(SnapshotError::UnsupportedVersion(version));
    }

    if version == 0 {
        value = upgrade_v0(value);
    }

    let obj = value.as_object().ok_or(SnapshotError::NotAnObject)?;
    for field in ["messages", "durations"] {
        if !obj.contains_key(field) {
            return Err(SnapshotError::MissingField(field));
        }
    }

    Ok(value)
}

/// v0 had the same fields, just no version tag
fn upgrade_v0(mut value: Value) -> Value {
    if let Some(obj) = value.as_object_mut() {
        obj.insert("version".to_string(), Value::from(1u64));
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_document_is_upgraded() {
        let raw = r#"{"messages":[{"id":"m1","role":"user","parts":[{"type":"text","text":"hi"}]}],"durations":{}}"#;
        let snapshot = Snapshot::from_json(raw).unwrap();
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].id, "m1");
        assert_eq!(snapshot.messages[0].role, Role::User);
        assert_eq!(snapshot.messages[0].text(), "hi");
    }

    #[test]
    fn test_future_version_is_rejected() {
        let raw = r#"{"version":7,"messages":[],"durations":{}}"#;
        assert!(matches!(
            Snapshot::from_json(raw),
            Err(SnapshotError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn test_missing_durations_is_rejected() {
        let raw = r#"{"messages":[]}"#;
        assert!(matches!(
            Snapshot::from_json(raw),
            Err(SnapshotError::MissingField("durations"))
        ));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let raw = r#"{"version":1,"messages":[
            {"id":"a","role":"user","parts":[]},
            {"id":"a","role":"assistant","parts":[]}
        ],"durations":{}}"#;
        assert!(matches!(
            Snapshot::from_json(raw),
            Err(SnapshotError::DuplicateTurnId(id)) if id == "a"
        ));
    }

    #[test]
    fn test_encoded_document_carries_version() {
        let json = Snapshot::default().to_json().unwrap();
        assert!(json.contains("\"version\":1"));
        assert!(json.contains("\"messages\":[]"));
        assert!(json.contains("\"durations\":{}"));
    }

    #[test]
    fn test_push_text_extends_trailing_part() {
        let mut turn = Turn::assistant("a1");
        turn.push_text("Hel");
        turn.push_text("lo");
        assert_eq!(turn.parts, vec![Part::text("Hello")]);
    }

    #[test]
    fn test_unknown_parts_are_kept_verbatim() {
        let raw = r#"{"messages":[{"id":"a1","role":"assistant","parts":[
            {"type":"step-start"},
            {"type":"text","text":"Answer","state":"done"},
            {"type":"tool-webSearch","toolCallId":"c1","state":"output-available","input":{"q":"x"}}
        ]}],"durations":{}}"#;
        let snapshot = Snapshot::from_json(raw).unwrap();
        let turn = &snapshot.messages[0];

        assert_eq!(turn.parts.len(), 3);
        assert_eq!(turn.parts[0].kind(), Some("step-start"));
        assert_eq!(turn.parts[2].kind(), Some("tool-webSearch"));
        assert_eq!(turn.text(), "Answer");

        let reencoded: Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        let original: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(reencoded["messages"], original["messages"]);
    }

    #[test]
    fn test_bad_durations_are_dropped_not_fatal() {
        let raw = r#"{"version":1,"messages":[{"id":"m1","role":"user","parts":[]}],
            "durations":{"m1":12,"m2":null,"m3":"slow"}}"#;
        let snapshot = Snapshot::from_json(raw).unwrap();
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.durations.len(), 1);
        assert_eq!(snapshot.durations.get("m1"), Some(&12.0));
    }

    #[test]
    fn test_non_finite_durations_are_not_encoded() {
        let mut durations = DurationMap::new();
        durations.insert("ok".to_string(), 5.0);
        durations.insert("nan".to_string(), f64::NAN);
        durations.insert("inf".to_string(), f64::INFINITY);
        let json = Snapshot::new(Vec::new(), durations).to_json().unwrap();

        let decoded = Snapshot::from_json(&json).unwrap();
        assert_eq!(decoded.durations.len(), 1);
        assert_eq!(decoded.durations.get("ok"), Some(&5.0));
    }

    #[test]
    fn test_welcome_turn_shape() {
        let turn = Turn::welcome("Hi there");
        assert!(turn.id.starts_with("welcome-"));
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.parts, vec![Part::text("Hi there")]);
    }
}
