//! Settings types with compiled defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object (`~/.charla/settings.json`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CharlaSettings {
    /// Client-side delivery settings.
    pub client: ClientSettings,
    /// Server-side settings.
    pub server: ServerSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl CharlaSettings {
    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.server.min_delay_ms > self.server.max_delay_ms {
            return Err(SettingsError::InvalidValue(format!(
                "server.minDelayMs ({}) exceeds server.maxDelayMs ({})",
                self.server.min_delay_ms, self.server.max_delay_ms
            )));
        }
        if self.client.event_buffer == 0 {
            return Err(SettingsError::InvalidValue(
                "client.eventBuffer must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// How the client reaches the server.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// Base HTTP URL of the server (`ws`/`wss` is derived for the socket).
    pub server_url: String,
    /// Path of the realtime WebSocket endpoint.
    pub socket_path: String,
    /// Path of the fallback request/response endpoint.
    pub chat_path: String,
    /// Deadline for a realtime reply in milliseconds.
    pub reply_timeout_ms: u64,
    /// Deadline for the WebSocket handshake in milliseconds.
    pub connect_timeout_ms: u64,
    /// Timeout applied by the HTTP client to fallback calls in milliseconds.
    pub http_timeout_ms: u64,
    /// Capacity of the inbound reply event buffer.
    pub event_buffer: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3000".to_string(),
            socket_path: "/api/socket".to_string(),
            chat_path: "/api/chat".to_string(),
            reply_timeout_ms: 10_000,
            connect_timeout_ms: 5_000,
            http_timeout_ms: 30_000,
            event_buffer: 64,
        }
    }
}

impl ClientSettings {
    /// Realtime reply deadline.
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    /// Handshake deadline.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// HTTP client timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Full URL of the fallback endpoint.
    pub fn chat_url(&self) -> String {
        join_url(&self.server_url, &self.chat_path)
    }

    /// Full URL of the realtime endpoint, with the scheme switched to `ws`/`wss`.
    pub fn socket_url(&self) -> String {
        let base = if let Some(rest) = self.server_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.server_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.server_url.clone()
        };
        join_url(&base, &self.socket_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Server network and responder settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` for auto-assign).
    pub port: u16,
    /// Lower bound of the simulated reply delay in milliseconds.
    pub min_delay_ms: u64,
    /// Upper bound of the simulated reply delay in milliseconds.
    pub max_delay_ms: u64,
    /// WebSocket ping interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Per-connection outbound frame queue.
    pub max_send_queue: usize,
    /// How long shutdown waits for in-flight tasks, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            min_delay_ms: 1_000,
            max_delay_ms: 3_000,
            heartbeat_interval_secs: 30,
            max_send_queue: 256,
            shutdown_timeout_secs: 10,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = CharlaSettings::default();
        assert_eq!(s.client.reply_timeout_ms, 10_000);
        assert_eq!(s.client.connect_timeout_ms, 5_000);
        assert_eq!(s.server.port, 3000);
        assert_eq!(s.server.min_delay_ms, 1_000);
        assert_eq!(s.server.max_delay_ms, 3_000);
        assert_eq!(s.logging.level, "info");
        assert!(s.validate().is_ok());
    }

    #[test]
    fn urls_derive_from_base() {
        let c = ClientSettings::default();
        assert_eq!(c.chat_url(), "http://127.0.0.1:3000/api/chat");
        assert_eq!(c.socket_url(), "ws://127.0.0.1:3000/api/socket");
    }

    #[test]
    fn https_base_maps_to_wss() {
        let c = ClientSettings {
            server_url: "https://chat.example.com/".into(),
            ..ClientSettings::default()
        };
        assert_eq!(c.socket_url(), "wss://chat.example.com/api/socket");
        assert_eq!(c.chat_url(), "https://chat.example.com/api/chat");
    }

    #[test]
    fn inverted_delay_is_invalid() {
        let mut s = CharlaSettings::default();
        s.server.min_delay_ms = 5_000;
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("minDelayMs"));
    }

    #[test]
    fn camel_case_keys() {
        let value = serde_json::to_value(CharlaSettings::default()).unwrap();
        assert!(value["client"]["replyTimeoutMs"].is_number());
        assert!(value["server"]["heartbeatIntervalSecs"].is_number());
    }
}
