use anyhow::Result;
use figment::{providers::{Env, Format, Serialized, Toml}, Figment};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub enable_cors: bool,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Connection string for the postgres backend
    pub url: String,
    /// JSON list of tariff plans loaded into the memory backend
    pub providers_file: Option<String>,
    /// Name of the plan to mark current after loading
    pub current_provider: Option<String>,
    pub default_sensor: String,
    pub measure_type: String,
    /// Synthetic readings generated at startup (memory backend only)
    pub demo_readings: usize,
}

/// Night-rate window of a user, times as `hh:mm`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub login: String,
    pub start_night_rate: String,
    pub end_night_rate: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                request_timeout_secs: 30,
                enable_cors: false,
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
                url: "postgres://localhost/consumption".to_string(),
                providers_file: None,
                current_provider: None,
                default_sensor: "main-meter".to_string(),
                measure_type: "electricity".to_string(),
                demo_readings: 0,
            },
            users: Vec::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("CAPI__").split("__"));
        Ok(figment.extract()?)
    }
}
