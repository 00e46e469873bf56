//! Server configuration.

use std::time::Duration;

use charla_settings::ServerSettings;

/// Runtime configuration for [`ChatServer`](crate::ChatServer).
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` for auto-assign).
    pub port: u16,
    /// Interval between WebSocket pings.
    pub heartbeat_interval: Duration,
    /// Per-connection outbound frame queue.
    pub max_send_queue: usize,
    /// How long shutdown waits for in-flight tasks.
    pub shutdown_timeout: Duration,
}

impl ServerConfig {
    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(s: &ServerSettings) -> Self {
        Self {
            host: s.host.clone(),
            port: s.port,
            heartbeat_interval: Duration::from_secs(s.heartbeat_interval_secs.max(1)),
            max_send_queue: s.max_send_queue.max(1),
            shutdown_timeout: Duration::from_secs(s.shutdown_timeout_secs),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            ..Self::from(&ServerSettings::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_auto_assigns_port() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 0);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.bind_addr(), "127.0.0.1:0");
    }

    #[test]
    fn from_settings_copies_fields() {
        let settings = ServerSettings {
            host: "0.0.0.0".into(),
            port: 4000,
            heartbeat_interval_secs: 5,
            max_send_queue: 8,
            ..ServerSettings::default()
        };
        let config = ServerConfig::from(&settings);
        assert_eq!(config.bind_addr(), "0.0.0.0:4000");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(config.max_send_queue, 8);
    }

    #[test]
    fn zero_heartbeat_is_clamped() {
        let settings = ServerSettings {
            heartbeat_interval_secs: 0,
            max_send_queue: 0,
            ..ServerSettings::default()
        };
        let config = ServerConfig::from(&settings);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(1));
        assert_eq!(config.max_send_queue, 1);
    }
}
