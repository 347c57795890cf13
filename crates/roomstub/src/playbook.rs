//! Playbook store: the scripted fixtures replayed to clients.
//!
//! A WebSocket fixture has two ordered sequences:
//!
//! ```json
//! { "init":      [ { "trigger_msg": "connect", "response": { "msg": "connected" } } ],
//!   "room_msgs": [ { "timing": 1.5, "response": { "msg": "changed" } } ] }
//! ```
//!
//! `init` is answered one entry per inbound message, `room_msgs` is pushed on a
//! timer afterwards. Both are read-only once loaded.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FixtureLoadError;

/// A JSON object sent to the client.
pub type ResponseBody = Map<String, Value>;

/// One request/response step of the interactive phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEntry {
    /// Expected `msg` of the inbound message for this step.
    #[serde(rename = "trigger_msg")]
    pub trigger: String,
    /// Reply body; its `id` is overwritten with the request's id.
    pub response: ResponseBody,
}

/// One unsolicited push of the timed phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedPushEntry {
    /// Seconds to wait after the previous emission.
    #[serde(rename = "timing")]
    pub delay_seconds: f64,
    /// Pushed verbatim.
    pub response: ResponseBody,
}

impl TimedPushEntry {
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_seconds).unwrap_or(Duration::ZERO)
    }
}

/// Parsed WebSocket fixture.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Playbook {
    init: Vec<InteractionEntry>,
    room_msgs: Vec<TimedPushEntry>,
}

impl Playbook {
    /// Load and validate a fixture file. Nothing is returned unless the whole
    /// document is usable.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FixtureLoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| FixtureLoadError::from_io(path.to_path_buf(), e))?;
        Self::parse(&content, path)
    }

    /// Parse a fixture held in memory.
    pub fn from_json(content: &str) -> Result<Self, FixtureLoadError> {
        Self::parse(content, Path::new("<memory>"))
    }

    fn parse(content: &str, path: &Path) -> Result<Self, FixtureLoadError> {
        let playbook: Playbook =
            serde_json::from_str(content).map_err(|source| FixtureLoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        playbook.validate()?;
        Ok(playbook)
    }

    fn validate(&self) -> Result<(), FixtureLoadError> {
        for (index, entry) in self.room_msgs.iter().enumerate() {
            let timing = entry.delay_seconds;
            if Duration::try_from_secs_f64(timing).is_err() {
                return Err(FixtureLoadError::InvalidTiming { index, timing });
            }
        }
        Ok(())
    }

    pub fn init(&self) -> &[InteractionEntry] {
        &self.init
    }

    pub fn room_msgs(&self) -> &[TimedPushEntry] {
        &self.room_msgs
    }
}

/// Document served by the static HTTP endpoint, kept as the file's exact bytes.
#[derive(Debug, Clone)]
pub struct HttpFixture {
    path: PathBuf,
    body: Vec<u8>,
}

impl HttpFixture {
    /// Read the file and check it is well-formed JSON of any shape.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FixtureLoadError> {
        let path = path.as_ref();
        let body =
            std::fs::read(path).map_err(|e| FixtureLoadError::from_io(path.to_path_buf(), e))?;
        serde_json::from_slice::<serde::de::IgnoredAny>(&body).map_err(|source| {
            FixtureLoadError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            body,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_fixture(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_preserves_order_and_length() {
        let source = json!({
            "init": [
                { "trigger_msg": "connect", "response": { "msg": "connected", "session": "abc" } },
                { "trigger_msg": "method", "response": { "msg": "result" } },
                { "trigger_msg": "sub", "response": { "msg": "ready" } }
            ],
            "room_msgs": [
                { "timing": 0.5, "response": { "msg": "changed", "n": 1 } },
                { "timing": 2, "response": { "msg": "changed", "n": 2 } }
            ]
        });
        let file = write_fixture(&source.to_string());

        let playbook = Playbook::load(file.path()).unwrap();

        let triggers: Vec<_> = playbook.init().iter().map(|e| e.trigger.as_str()).collect();
        assert_eq!(triggers, ["connect", "method", "sub"]);
        assert_eq!(playbook.init()[0].response["session"], "abc");

        assert_eq!(playbook.room_msgs().len(), 2);
        assert_eq!(playbook.room_msgs()[0].response["n"], 1);
        assert_eq!(playbook.room_msgs()[1].delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_empty_sequences_are_valid() {
        let playbook = Playbook::from_json(r#"{"init": [], "room_msgs": []}"#).unwrap();
        assert!(playbook.init().is_empty());
        assert!(playbook.room_msgs().is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = Playbook::load("/nonexistent/ws_responses.json").unwrap_err();
        assert!(matches!(err, FixtureLoadError::NotFound { .. }));
    }

    #[test]
    fn test_not_json() {
        let file = write_fixture("init: []");
        let err = Playbook::load(file.path()).unwrap_err();
        assert!(matches!(err, FixtureLoadError::Parse { .. }));
    }

    #[test]
    fn test_missing_room_msgs_key() {
        let err = Playbook::from_json(r#"{"init": []}"#).unwrap_err();
        match err {
            FixtureLoadError::Parse { source, .. } => {
                assert!(source.to_string().contains("room_msgs"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_response_must_be_object() {
        let err = Playbook::from_json(
            r#"{"init": [{"trigger_msg": "connect", "response": "connected"}], "room_msgs": []}"#,
        )
        .unwrap_err();
        assert!(matches!(err, FixtureLoadError::Parse { .. }));
    }

    #[test]
    fn test_negative_timing_rejected() {
        let err = Playbook::from_json(
            r#"{"init": [], "room_msgs": [{"timing": 1, "response": {}}, {"timing": -0.5, "response": {}}]}"#,
        )
        .unwrap_err();
        match err {
            FixtureLoadError::InvalidTiming { index, timing } => {
                assert_eq!(index, 1);
                assert_eq!(timing, -0.5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bundled_fixtures_load() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures");

        let playbook = Playbook::load(root.join("ws_responses.json")).unwrap();
        assert_eq!(playbook.init()[0].trigger, "connect");
        assert!(!playbook.room_msgs().is_empty());

        HttpFixture::load(root.join("http_response.json")).unwrap();
    }

    #[test]
    fn test_http_fixture_keeps_exact_bytes() {
        let content = "{\n  \"update\": [ {\"_id\": \"GENERAL\"} ],\n  \"success\": true\n}\n";
        let file = write_fixture(content);

        let fixture = HttpFixture::load(file.path()).unwrap();
        assert_eq!(fixture.body(), content.as_bytes());
    }

    #[test]
    fn test_http_fixture_rejects_invalid_json() {
        let file = write_fixture("{\"update\": [");
        let err = HttpFixture::load(file.path()).unwrap_err();
        assert!(matches!(err, FixtureLoadError::Parse { .. }));
    }
}
