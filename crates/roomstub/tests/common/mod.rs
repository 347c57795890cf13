//! Test utilities and common setup.

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;

use roomstub::config::{HttpServerConfig, WsServerConfig};
use roomstub::{MatchPolicy, Playbook, ServerHandle, WsServer};
use serde_json::Value;
use tempfile::NamedTempFile;

/// Write `content` to a temporary file that lives as long as the handle.
pub fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

/// WebSocket config bound to an ephemeral loopback port.
pub fn ws_config(fixture: PathBuf, match_policy: MatchPolicy) -> WsServerConfig {
    WsServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        fixture,
        match_policy,
    }
}

/// HTTP config bound to an ephemeral loopback port.
pub fn http_config(fixture: PathBuf) -> HttpServerConfig {
    HttpServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        fixture,
    }
}

/// Start a playback server for an in-memory fixture.
pub async fn start_ws(fixture: Value, match_policy: MatchPolicy) -> ServerHandle {
    let playbook = Playbook::from_json(&fixture.to_string()).unwrap();
    let config = ws_config(PathBuf::new(), match_policy);
    WsServer::with_playbook(config, playbook)
        .start()
        .await
        .unwrap()
}
