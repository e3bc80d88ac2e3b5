use std::net::IpAddr;
use std::time::Duration;

use pfcpsim_client::{ClientConfig, RetryPolicy};
use pfcpsim_config::{BackoffConfig, SimConfig};
use pfcpsim_core::NodeId;

use crate::error::ServiceError;

/// Client settings for the configured peer
pub fn client_config(config: &SimConfig) -> Result<ClientConfig, ServiceError> {
    let mut client = ClientConfig::new(config.peer_socket_addr()?)
        .with_local_port(config.local_port)
        .with_heartbeat_interval(config.heartbeat_interval())
        .with_max_missed_heartbeats(config.max_missed_heartbeats)
        .with_retry(retry_policy(config))
        // A heartbeat answer arriving after the next tick is as good as lost
        .with_heartbeat_retry(RetryPolicy::fixed(
            0,
            config.retry_interval().min(config.heartbeat_interval()),
        ));

    if let Some(local) = config.local_address {
        client = client.with_local_address(local);
    }
    if let Some(node_id) = config.node_id.as_deref() {
        client = client.with_node_id(parse_node_id(node_id)?);
    }
    Ok(client)
}

pub fn retry_policy(config: &SimConfig) -> RetryPolicy {
    match config.backoff {
        BackoffConfig::Fixed => RetryPolicy::fixed(config.max_retries, config.retry_interval()),
        BackoffConfig::Exponential {
            factor,
            max_interval_ms,
        } => RetryPolicy::exponential(
            config.max_retries,
            config.retry_interval(),
            factor,
            Duration::from_millis(max_interval_ms),
        ),
    }
}

fn parse_node_id(value: &str) -> Result<NodeId, ServiceError> {
    if let Ok(ip) = value.parse::<IpAddr>() {
        return Ok(NodeId::from(ip));
    }
    if value.is_empty() || value.len() > 255 {
        return Err(ServiceError::InvalidArgument(format!(
            "invalid node ID '{value}'"
        )));
    }
    Ok(NodeId::Fqdn(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfcpsim_client::Backoff;
    use std::net::Ipv4Addr;

    #[test]
    fn test_client_config_from_defaults() {
        let config = SimConfig::default();
        let client = client_config(&config).unwrap();

        assert_eq!(client.peer_address, "127.0.0.1:8805".parse().unwrap());
        assert_eq!(client.local_address, None);
        assert_eq!(client.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(client.retry.attempts(), 4);
        assert_eq!(client.heartbeat_retry.attempts(), 1);
        assert_eq!(client.heartbeat_retry.interval, Duration::from_secs(3));
    }

    #[test]
    fn test_exponential_backoff_and_node_id() {
        let config = SimConfig {
            node_id: Some("smf.example.org".to_string()),
            local_address: Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))),
            backoff: BackoffConfig::Exponential {
                factor: 2.0,
                max_interval_ms: 8_000,
            },
            ..SimConfig::default()
        };
        let client = client_config(&config).unwrap();

        assert_eq!(client.node_id, Some(NodeId::Fqdn("smf.example.org".to_string())));
        assert_eq!(
            client.retry.backoff,
            Backoff::Exponential {
                factor: 2.0,
                max_interval: Duration::from_secs(8)
            }
        );
    }

    #[test]
    fn test_bad_peer_address() {
        let config = SimConfig {
            peer_address: "not-an-address".to_string(),
            ..SimConfig::default()
        };
        assert!(matches!(
            client_config(&config),
            Err(ServiceError::Config(_))
        ));
    }
}
