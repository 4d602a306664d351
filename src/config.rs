//! Runtime configuration of the portal: addresses, ports and timings.

use std::net::Ipv4Addr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Fixed address of the access point; also gateway and DNS server for clients.
pub const AP_IP: Ipv4Addr = Ipv4Addr::new(10, 10, 10, 10);

/// Runtime knobs of the configuration portal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Page title and SSID prefix.
    pub app_name: String,
    pub ap_ip: Ipv4Addr,
    pub ap_prefix_len: u8,
    pub ap_channel: u8,
    pub ap_max_connections: u16,
    pub http_port: u16,
    pub dns_port: u16,
    pub dns_ttl: u32,
    pub trigger_window_ms: u64,
    /// Blink period while waiting for the button.
    pub trigger_poll_ms: u64,
    /// Blink period while the portal is up.
    pub loop_interval_ms: u64,
    /// Pause between tearing the network down and resetting.
    pub restart_flush_ms: u64,
    /// Fields whose name starts with one of these are rendered as password inputs.
    pub sensitive_prefixes: Vec<String>,
    /// Requests that may wait for the portal loop before new ones get a 503.
    pub queue_depth: usize,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            app_name: "Cfg".to_string(),
            ap_ip: AP_IP,
            ap_prefix_len: 24,
            ap_channel: 1,
            ap_max_connections: 4,
            http_port: 80,
            dns_port: 53,
            dns_ttl: 60,
            trigger_window_ms: 3000,
            trigger_poll_ms: 50,
            loop_interval_ms: 999,
            restart_flush_ms: 1000,
            sensitive_prefixes: vec!["P".to_string(), "pass".to_string()],
            queue_depth: 4,
        }
    }
}

impl PortalConfig {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_name.is_empty() {
            return Err(ConfigError::EmptyAppName);
        }
        Ok(())
    }

    pub fn trigger_window(&self) -> Duration {
        Duration::from_millis(self.trigger_window_ms)
    }

    pub fn trigger_poll_interval(&self) -> Duration {
        Duration::from_millis(self.trigger_poll_ms)
    }

    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms)
    }

    pub fn restart_flush(&self) -> Duration {
        Duration::from_millis(self.restart_flush_ms)
    }

    pub fn is_sensitive(&self, name: &str) -> bool {
        self.sensitive_prefixes
            .iter()
            .any(|p| !p.is_empty() && name.starts_with(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = PortalConfig::from_json(r#"{"app_name": "nCLC", "dns_port": 5353}"#).unwrap();
        assert_eq!(config.app_name, "nCLC");
        assert_eq!(config.dns_port, 5353);
        assert_eq!(config.http_port, 80);
        assert_eq!(config.ap_ip, AP_IP);
        assert_eq!(config.loop_interval(), Duration::from_millis(999));
    }

    #[test]
    fn empty_app_name_is_rejected() {
        assert!(matches!(
            PortalConfig::from_json(r#"{"app_name": ""}"#),
            Err(ConfigError::EmptyAppName)
        ));
        assert!(matches!(
            PortalConfig::from_json("{"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn sensitive_names_follow_prefixes() {
        let config = PortalConfig::default();
        assert!(config.is_sensitive("Password"));
        assert!(config.is_sensitive("password"));
        assert!(config.is_sensitive("PIN"));
        assert!(!config.is_sensitive("ssid"));
        assert!(!config.is_sensitive("pin"));
    }
}
