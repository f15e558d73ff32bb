use crate::dns::DnsLookup;
use crate::endpoint::{EndpointResolver, ResolvedEndpoint};
use crate::{Error, Result};
use std::fs;

/// Environment variable overriding the configured daemon address.
pub const DAEMON_ADDRESS_ENV: &str = "TRACEPOST_DAEMON_ADDRESS";

#[derive(Debug, Clone)]
pub struct Config {
    pub service_name: String,
    pub daemon: DaemonConfig,
}

impl Config {
    pub fn load_json_file(path: String) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let value = content.parse::<serde_json::Value>()?;

        let mut config = Self::default();
        config.merge_json(&value)?;
        Ok(config)
    }

    pub fn merge_json(&mut self, val: &serde_json::Value) -> Result<()> {
        if let serde_json::Value::Object(table) = val {
            if let Some(val) = table.get("service_name") {
                self.service_name = as_str(val, "service_name")?;
            }
            if let Some(val) = table.get("daemon") {
                self.daemon.merge_json(val)?;
            }
        }
        Ok(())
    }

    /// Applies environment overrides on top of defaults and file values.
    pub fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var(DAEMON_ADDRESS_ENV) {
            self.daemon.address = addr;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "unnamed-service".to_string(),
            daemon: DaemonConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Where the tracing daemon listens, as text. Host, host:port, v4, v6
    /// bracketed or bare; validated by the resolver, not here.
    pub address: String,
    /// Port used when `address` carries none.
    pub default_port: Option<u16>,
}

impl DaemonConfig {
    pub fn merge_json(&mut self, val: &serde_json::Value) -> Result<()> {
        if let serde_json::Value::Object(table) = val {
            if let Some(val) = table.get("address") {
                self.address = as_str(val, "daemon.address")?;
            }
            if let Some(val) = table.get("default_port") {
                // Narrowed here so a bad default fails before any address
                // text is parsed.
                let n = val
                    .as_u64()
                    .ok_or_else(|| Error::InvalidDefaultPort(val.to_string()))?;
                let port =
                    u16::try_from(n).map_err(|_| Error::InvalidDefaultPort(n.to_string()))?;
                self.default_port = Some(port);
            }
        }
        Ok(())
    }

    /// Resolves the configured address through the system resolver.
    pub fn to_endpoint(&self) -> Result<ResolvedEndpoint> {
        self.to_endpoint_with(&EndpointResolver::new())
    }

    pub fn to_endpoint_with<D: DnsLookup>(
        &self,
        resolver: &EndpointResolver<D>,
    ) -> Result<ResolvedEndpoint> {
        resolver.resolve(&self.address, self.default_port)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:2000".to_string(),
            default_port: Some(2000),
        }
    }
}

fn as_str(val: &serde_json::Value, field: &str) -> Result<String> {
    val.as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidInput(format!("{field} must be a string")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        let ep = config.daemon.to_endpoint().unwrap();
        assert_eq!(ep.to_string(), "127.0.0.1:2000");
    }

    #[test]
    fn test_merge_json() {
        let mut config = Config::default();

        let json_val = r#"
        {
            "service_name": "checkout",
            "daemon": {
                "address": "10.0.0.7:3000"
            }
        }
        "#
        .parse::<serde_json::Value>()
        .unwrap();

        config.merge_json(&json_val).unwrap();

        assert_eq!(config.service_name, "checkout");
        assert_eq!(config.daemon.address, "10.0.0.7:3000");
        // Untouched fields keep their defaults.
        assert_eq!(config.daemon.default_port, Some(2000));
    }

    #[test]
    fn test_default_port_merge() {
        let mut config = Config::default();
        let json_val = r#"{ "daemon": { "default_port": 4000 } }"#
            .parse::<serde_json::Value>()
            .unwrap();
        config.merge_json(&json_val).unwrap();
        assert_eq!(config.daemon.default_port, Some(4000));
    }

    #[test]
    fn test_out_of_range_default_port_rejected_before_parsing() {
        let mut config = Config::default();
        for raw in [r#"{ "daemon": { "default_port": 70000 } }"#,
                    r#"{ "daemon": { "default_port": -1 } }"#,
                    r#"{ "daemon": { "default_port": "80" } }"#] {
            let json_val = raw.parse::<serde_json::Value>().unwrap();
            assert!(
                matches!(
                    config.merge_json(&json_val),
                    Err(Error::InvalidDefaultPort(_))
                ),
                "{raw} must be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_default_port_rendering() {
        let mut config = Config::default();

        let json_val = r#"{ "daemon": { "default_port": 70000 } }"#
            .parse::<serde_json::Value>()
            .unwrap();
        let err = config.merge_json(&json_val).unwrap_err();
        assert_eq!(err.to_string(), "invalid default port 70000");

        // Non-integer values render the offending JSON, not a range claim.
        let json_val = r#"{ "daemon": { "default_port": "80" } }"#
            .parse::<serde_json::Value>()
            .unwrap();
        let err = config.merge_json(&json_val).unwrap_err();
        assert_eq!(err.to_string(), "invalid default port \"80\"");
    }

    #[test]
    fn test_apply_env_overrides_address() {
        let mut config = Config::default();
        std::env::set_var(DAEMON_ADDRESS_ENV, "10.9.8.7:4100");
        config.apply_env();
        std::env::remove_var(DAEMON_ADDRESS_ENV);
        assert_eq!(config.daemon.address, "10.9.8.7:4100");

        // Without the variable the configured address stands.
        let mut config = Config::default();
        config.apply_env();
        assert_eq!(config.daemon.address, "127.0.0.1:2000");
    }

    #[test]
    fn test_load_json_file() {
        let path = std::env::temp_dir().join("tracepost-config-test.json");
        std::fs::write(
            &path,
            r#"
            {
                "service_name": "payments",
                "daemon": {
                    "address": "daemon.host",
                    "default_port": 3000
                }
            }
            "#,
        )
        .unwrap();

        let config = Config::load_json_file(path.to_str().unwrap().to_string()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.service_name, "payments");
        assert_eq!(config.daemon.address, "daemon.host");
        assert_eq!(config.daemon.default_port, Some(3000));
    }

    #[test]
    fn test_load_json_file_missing_path() {
        assert!(matches!(
            Config::load_json_file("/nonexistent/tracepost.json".to_string()),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_daemon_address_to_endpoint() {
        let daemon = DaemonConfig {
            address: "[::1]:9000".to_string(),
            default_port: None,
        };
        let ep = daemon.to_endpoint().unwrap();
        assert_eq!(ep.to_string(), "[::1]:9000");
    }
}
