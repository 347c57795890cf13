use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::playback::MatchPolicy;

/// Prefix for environment overrides, e.g. `ROOMSTUB__WS__PORT=6000`.
pub const ENV_PREFIX: &str = "ROOMSTUB";

/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "roomstub.toml";

/// Top-level configuration for both servers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ws: WsServerConfig,
    pub http: HttpServerConfig,
}

/// WebSocket playback server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WsServerConfig {
    /// Address to bind to
    pub host: String,
    /// Port to listen on (0 picks a free port)
    pub port: u16,
    /// Playbook fixture (`init` + `room_msgs`)
    pub fixture: PathBuf,
    /// Handling of inbound messages that do not match the scripted trigger
    pub match_policy: MatchPolicy,
}

impl Default for WsServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5550,
            fixture: PathBuf::from("fixtures/ws_responses.json"),
            match_policy: MatchPolicy::default(),
        }
    }
}

/// Static HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpServerConfig {
    /// Address to bind to
    pub host: String,
    /// Port to listen on (0 picks a free port)
    pub port: u16,
    /// JSON document served from the rooms endpoint
    pub fixture: PathBuf,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5555,
            fixture: PathBuf::from("fixtures/http_response.json"),
        }
    }
}

impl AppConfig {
    /// Defaults, then the TOML file (if it exists), then `ROOMSTUB__*` variables.
    pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
        Self::builder(path)
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Same as [`AppConfig::load`] without the environment layer.
    pub fn from_file(path: &Path) -> Result<Self, config::ConfigError> {
        Self::builder(path).build()?.try_deserialize()
    }

    fn builder(path: &Path) -> config::ConfigBuilder<config::builder::DefaultState> {
        Config::builder().add_source(
            File::from(path)
                .format(FileFormat::Toml)
                .required(false),
        )
    }

    /// Render as TOML, for `roomstub config show`.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::from_file(Path::new("/nonexistent/roomstub.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.ws.port, 5550);
        assert_eq!(config.http.port, 5555);
        assert_eq!(config.ws.match_policy, MatchPolicy::Lenient);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "[ws]\nport = 6000\nmatch_policy = \"strict\"\n\n[http]\nfixture = \"data/rooms.json\""
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();

        assert_eq!(config.ws.port, 6000);
        assert_eq!(config.ws.host, "localhost");
        assert_eq!(config.ws.match_policy, MatchPolicy::Strict);
        assert_eq!(config.http.fixture, PathBuf::from("data/rooms.json"));
        assert_eq!(config.http.port, 5555);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[ws]\nport = 6000\nmatch_policy = \"lenient\"").unwrap();

        // Only this test reads the ROOMSTUB__ variables.
        unsafe {
            std::env::set_var("ROOMSTUB__WS__PORT", "6001");
            std::env::set_var("ROOMSTUB__WS__MATCH_POLICY", "strict");
        }
        let loaded = AppConfig::load(file.path());
        unsafe {
            std::env::remove_var("ROOMSTUB__WS__PORT");
            std::env::remove_var("ROOMSTUB__WS__MATCH_POLICY");
        }

        let config = loaded.unwrap();
        assert_eq!(config.ws.port, 6001);
        assert_eq!(config.ws.match_policy, MatchPolicy::Strict);
        assert_eq!(config.ws.host, "localhost");
        assert_eq!(config.http, HttpServerConfig::default());
    }

    #[test]
    fn test_to_toml_round_trips_through_loader() {
        let mut config = AppConfig::default();
        config.http.port = 0;
        let rendered = config.to_toml().unwrap();

        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        file.write_all(rendered.as_bytes()).unwrap();

        assert_eq!(AppConfig::from_file(file.path()).unwrap(), config);
    }
}
