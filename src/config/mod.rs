use anyhow::{Context, Result};
use serde::Deserialize;

/// Complete agent configuration, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub broker: BrokerConfig,
    pub context_store: StoreConfig,
    pub history_store: StoreConfig,
    pub oracle: OracleConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub life: LifeConfig,
}

/// MQTT broker connection and the agent's own place in the topic tree.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    pub host: String,
    #[serde(default = "default_broker_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Hierarchical network location, the first topic segment.
    pub location: String,
    pub zone: String,
    /// The agent's entity id in the context store.
    pub entity: String,
    /// MQTT client id.
    pub name: String,
}

fn default_broker_port() -> u16 {
    1883
}

/// An HTTP backing service (context store or history store).
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

/// Access-control oracle endpoint and the fixed service identity the
/// authorization query executes under.
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Ledger account the query is issued from.
    pub service_address: String,
}

/// HTTP boundary (About / Rules) listener.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

/// Self-telemetry publisher schedule and coordinates.
#[derive(Debug, Clone, Deserialize)]
pub struct LifeConfig {
    #[serde(default = "default_life_interval")]
    pub interval_secs: u64,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

fn default_life_interval() -> u64 {
    300
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_life_interval(),
            latitude: 0.0,
            longitude: 0.0,
        }
    }
}

/// Load configuration from a TOML file.
pub fn load_config(path: &str) -> Result<AgentConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{path}'"))?;
    let config: AgentConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file '{path}'"))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [broker]
        host = "broker.example.com"
        username = "agent1"
        password = "secret"
        location = "site1"
        zone = "zoneA"
        entity = "agent1"
        name = "iotbridge-agent1"

        [context_store]
        base_url = "http://cdi.example.com/v1"
        username = "agent1"
        password = "secret"

        [history_store]
        base_url = "http://hdi.example.com/v1"
        username = "agent1"
        password = "secret"

        [oracle]
        base_url = "http://bch.example.com"
        username = "agent1"
        password = "secret"
        service_address = "0xabc123"
    "#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: AgentConfig = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.life.interval_secs, 300);
        assert_eq!(config.life.latitude, 0.0);
    }

    #[test]
    fn explicit_sections_override_defaults() {
        let toml = format!(
            "{MINIMAL}\n[server]\nhost = \"127.0.0.1\"\nport = 9000\n\n[life]\ninterval_secs = 60\nlatitude = 41.65\nlongitude = -0.87\n"
        );
        let config: AgentConfig = toml::from_str(&toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.life.interval_secs, 60);
        assert_eq!(config.life.longitude, -0.87);
    }

    #[test]
    fn missing_store_section_is_an_error() {
        let toml = r#"
            [broker]
            host = "broker.example.com"
            username = "agent1"
            password = "secret"
            location = "site1"
            zone = "zoneA"
            entity = "agent1"
            name = "iotbridge-agent1"
        "#;
        assert!(toml::from_str::<AgentConfig>(toml).is_err());
    }
}
