//! Client configuration.

use std::time::Duration;

use serde::Deserialize;

/// Default server endpoint.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000/";

/// Environment variable overriding the server endpoint.
pub const SERVER_URL_ENV: &str = "COINROOM_SERVER_URL";

/// Default delay between "room created" and the automatic join (1 second).
pub const DEFAULT_JOIN_DELAY: Duration = Duration::from_millis(1000);

/// Default key of the durable identity slot.
pub const DEFAULT_IDENTITY_KEY: &str = "clientId";

/// Client configuration.
///
/// Every field has a default, so a JSON document only needs the fields it
/// overrides:
///
/// ```
/// use coinroom_sync::config::ClientConfig;
///
/// let config = ClientConfig::from_json(r#"{"join_delay_ms": 250}"#).unwrap();
/// assert_eq!(config.join_delay.as_millis(), 250);
/// assert_eq!(config.identity_key, "clientId");
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Room server endpoint handed to the transport.
    pub server_url: String,

    /// Delay before the automatic join that follows "room created".
    #[serde(rename = "join_delay_ms", deserialize_with = "duration_from_millis")]
    pub join_delay: Duration,

    /// Key of the durable slot holding the client id.
    pub identity_key: String,

    /// Room name used by `create_room_default`.
    pub room_name: String,

    /// Room password used by `create_room_default`.
    pub room_password: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            join_delay: DEFAULT_JOIN_DELAY,
            identity_key: DEFAULT_IDENTITY_KEY.to_string(),
            room_name: "testroom".to_string(),
            room_password: "testpassword".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, with the server URL taken from `COINROOM_SERVER_URL` if set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            if !url.trim().is_empty() {
                config.server_url = url;
            }
        }
        config
    }

    /// Parse a (possibly partial) JSON document over the defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    #[must_use]
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    #[must_use]
    pub fn with_join_delay(mut self, delay: Duration) -> Self {
        self.join_delay = delay;
        self
    }

    #[must_use]
    pub fn with_identity_key(mut self, key: impl Into<String>) -> Self {
        self.identity_key = key.into();
        self
    }

    #[must_use]
    pub fn with_room_credentials(
        mut self,
        name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.room_name = name.into();
        self.room_password = password.into();
        self
    }
}

fn duration_from_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.server_url, "http://localhost:3000/");
        assert_eq!(config.join_delay, Duration::from_secs(1));
        assert_eq!(config.identity_key, "clientId");
        assert_eq!(config.room_name, "testroom");
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            ClientConfig::from_json(r#"{"server_url": "ws://game:9000", "join_delay_ms": 50}"#)
                .unwrap();
        assert_eq!(config.server_url, "ws://game:9000");
        assert_eq!(config.join_delay, Duration::from_millis(50));
        assert_eq!(config.room_password, "testpassword");
    }

    #[test]
    fn test_from_json_rejects_bad_delay() {
        assert!(ClientConfig::from_json(r#"{"join_delay_ms": "soon"}"#).is_err());
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new()
            .with_join_delay(Duration::ZERO)
            .with_identity_key("id-slot")
            .with_room_credentials("lobby", "hunter2");
        assert_eq!(config.join_delay, Duration::ZERO);
        assert_eq!(config.identity_key, "id-slot");
        assert_eq!(config.room_name, "lobby");
        assert_eq!(config.room_password, "hunter2");
    }

    // Only test touching SERVER_URL_ENV
    #[test]
    fn test_from_env() {
        std::env::set_var(SERVER_URL_ENV, "ws://override:4000");
        assert_eq!(ClientConfig::from_env().server_url, "ws://override:4000");

        std::env::set_var(SERVER_URL_ENV, "   ");
        assert_eq!(ClientConfig::from_env().server_url, DEFAULT_SERVER_URL);

        std::env::remove_var(SERVER_URL_ENV);
        assert_eq!(ClientConfig::from_env(), ClientConfig::default());
    }
}
