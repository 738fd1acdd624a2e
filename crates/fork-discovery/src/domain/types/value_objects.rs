//! Value objects for the discovery engine.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Bucket index of a node relative to another (0-255).
///
/// 0 means the first bit differs (farthest), 255 means identical or only the
/// last bit differs (closest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Distance(pub u8);

impl Distance {
    /// Create a new Distance value.
    pub fn new(bucket_index: u8) -> Self {
        Self(bucket_index)
    }

    /// Bucket index (0-255).
    pub fn bucket_index(&self) -> u8 {
        self.0
    }
}

/// Discovery engine parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// UDP address the engine binds to.
    pub listen_addr: SocketAddr,
    /// Address advertised in the local record when `listen_addr` is unspecified.
    pub advertised_ip: Option<IpAddr>,
    /// TCP port advertised for the connection manager (0 = not dialable).
    pub tcp_port: u16,
    /// Bucket size.
    pub k: usize,
    /// Parallel queries per lookup round.
    pub alpha: usize,
    /// Per-request timeout.
    pub request_timeout_ms: u64,
    /// Maximum rounds of an iterative lookup.
    pub max_lookup_rounds: usize,
    /// Interval at which the local fork entry is re-derived.
    pub refresh_interval_secs: u64,
    /// Largest encoded record accepted from the network.
    pub max_record_size: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 9000),
            advertised_ip: None,
            tcp_port: 13000,
            k: 16,
            alpha: 3,
            request_timeout_ms: 500,
            max_lookup_rounds: 8,
            refresh_interval_secs: 12,
            max_record_size: 300,
        }
    }
}

impl DiscoveryConfig {
    /// Loopback config on an ephemeral port with short timeouts.
    pub fn for_testing() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            advertised_ip: None,
            tcp_port: 13000,
            k: 16,
            alpha: 3,
            request_timeout_ms: 300,
            max_lookup_rounds: 4,
            refresh_interval_secs: 1,
            max_record_size: 300,
        }
    }

    /// Per-request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Refresh interval as a `Duration`, never zero.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_ordering() {
        assert!(Distance::new(0) < Distance::new(128));
        assert!(Distance::new(128) < Distance::new(255));
    }

    #[test]
    fn test_discovery_config_defaults() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.k, 16);
        assert_eq!(config.alpha, 3);
        assert_eq!(config.max_record_size, 300);
        assert_eq!(config.listen_addr.port(), 9000);
    }

    #[test]
    fn test_refresh_interval_never_zero() {
        let config = DiscoveryConfig {
            refresh_interval_secs: 0,
            ..DiscoveryConfig::default()
        };
        assert_eq!(config.refresh_interval(), Duration::from_secs(1));
    }
}
