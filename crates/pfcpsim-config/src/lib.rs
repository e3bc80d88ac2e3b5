use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Well-known PFCP port
pub const PFCP_PORT: u16 = 8805;

/// Configuration error
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    LoadError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Retransmission backoff between attempts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackoffConfig {
    #[default]
    Fixed,
    Exponential { factor: f64, max_interval_ms: u64 },
}

/// Sessions created right after association
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SessionPlanConfig {
    #[validate(range(min = 1))]
    pub count: u32,
    /// First session ID; uplink TEIDs and rule ranges derive from it
    #[validate(range(min = 1))]
    pub base_id: u32,
    /// IPv4 prefix handing out UE addresses, e.g. `17.0.0.0/24`
    #[validate(custom(function = "validate_pool"))]
    pub ue_address_pool: String,
    pub gnb_address: Ipv4Addr,
    #[validate(range(max = 63))]
    pub qfi: u8,
}

/// Simulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SimConfig {
    #[validate(length(min = 1))]
    pub service_name: String,
    #[validate(length(min = 1))]
    pub log_level: String,
    /// `json` or `plain`
    #[validate(custom(function = "validate_log_format"))]
    pub log_format: String,

    /// `ip` or `ip:port`; the port defaults to 8805
    #[validate(length(min = 1))]
    pub peer_address: String,
    pub local_address: Option<IpAddr>,
    pub local_port: u16,
    /// IP address or FQDN; defaults to the local address
    pub node_id: Option<String>,
    /// UPF address used in uplink F-TEIDs
    pub upf_n3_address: Ipv4Addr,

    #[validate(range(min = 1))]
    pub heartbeat_interval_ms: u64,
    #[validate(range(min = 1))]
    pub max_missed_heartbeats: u32,
    pub max_retries: u32,
    #[validate(range(min = 1))]
    pub retry_interval_ms: u64,
    #[validate(custom(function = "validate_backoff"))]
    pub backoff: BackoffConfig,

    #[validate(nested)]
    pub sessions: Option<SessionPlanConfig>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            service_name: "pfcpsim".to_string(),
            log_level: "info".to_string(),
            log_format: "json".to_string(),
            peer_address: "127.0.0.1".to_string(),
            local_address: None,
            local_port: 0,
            node_id: None,
            upf_n3_address: Ipv4Addr::new(198, 18, 0, 1),
            heartbeat_interval_ms: 5_000,
            max_missed_heartbeats: 3,
            max_retries: 3,
            retry_interval_ms: 3_000,
            backoff: BackoffConfig::Fixed,
            sessions: None,
        }
    }
}

impl SimConfig {
    pub fn peer_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_peer_address(&self.peer_address)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

/// Accept `ip:port`, `[v6]:port` or a bare address on the PFCP port
pub fn parse_peer_address(value: &str) -> Result<SocketAddr, ConfigError> {
    if let Ok(addr) = value.parse::<SocketAddr>() {
        return Ok(addr);
    }
    value
        .parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, PFCP_PORT))
        .map_err(|_| ConfigError::ValidationError(format!("invalid peer address '{value}'")))
}

/// Split `a.b.c.d/len` into network address and prefix length
pub fn parse_ipv4_pool(value: &str) -> Option<(Ipv4Addr, u8)> {
    let (addr, len) = value.split_once('/')?;
    let addr: Ipv4Addr = addr.trim().parse().ok()?;
    let len: u8 = len.trim().parse().ok()?;
    (len <= 32).then_some((addr, len))
}

fn validate_pool(value: &str) -> Result<(), ValidationError> {
    match parse_ipv4_pool(value) {
        Some((_, len)) if len < 32 => Ok(()),
        _ => Err(ValidationError::new("ue_address_pool")
            .with_message("expected an IPv4 prefix such as 17.0.0.0/24".into())),
    }
}

fn validate_log_format(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "json" | "plain" | "text" | "pretty" => Ok(()),
        _ => Err(ValidationError::new("log_format")),
    }
}

fn validate_backoff(backoff: &BackoffConfig) -> Result<(), ValidationError> {
    match backoff {
        BackoffConfig::Fixed => Ok(()),
        BackoffConfig::Exponential {
            factor,
            max_interval_ms,
        } if *factor >= 1.0 && *max_interval_ms > 0 => Ok(()),
        BackoffConfig::Exponential { .. } => Err(ValidationError::new("backoff")
            .with_message("exponential backoff needs factor >= 1 and a positive max interval".into())),
    }
}

/// Load configuration from file, overridden by `PFCPSIM_*` environment variables
pub fn load_config<T>(path: &str) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de> + Validate,
{
    let config: T = config::Config::builder()
        .add_source(config::File::with_name(path))
        .add_source(config::Environment::with_prefix("PFCPSIM").try_parsing(true))
        .build()
        .map_err(|e| ConfigError::LoadError(e.to_string()))?
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError(e.to_string()))?;

    config
        .validate()
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
    Ok(config)
}

/// Load configuration from `PFCPSIM_*` environment variables only
pub fn load_from_env<T>() -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de> + Validate,
{
    let config: T = config::Config::builder()
        .add_source(config::Environment::with_prefix("PFCPSIM").try_parsing(true))
        .build()
        .map_err(|e| ConfigError::LoadError(e.to_string()))?
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError(e.to_string()))?;

    config
        .validate()
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
    Ok(config)
}

/// Load configuration from YAML string (for testing)
pub fn load_from_yaml<T>(yaml: &str) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de> + Validate,
{
    let config: T =
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::LoadError(e.to_string()))?;
    config
        .validate()
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
    Ok(config)
}
