//! Configuration providers.

use crate::domain::{DiscoveryConfig, GenesisInfo, NetworkConfig};
use crate::ports::ConfigProvider;

// ============================================================================
// StaticConfigProvider - In-memory config for testing/development
// ============================================================================

/// Static configuration provider with values set in code.
///
/// Useful for testing and development. For production, use `TomlConfigProvider`.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    network: NetworkConfig,
    discovery: DiscoveryConfig,
    genesis: Option<GenesisInfo>,
    bootstrap: Vec<String>,
    node_key: Option<[u8; 32]>,
}

impl StaticConfigProvider {
    /// Default network and discovery config, pre-genesis, no bootstrap nodes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this fork schedule and slot timing.
    #[must_use]
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    /// Use these engine parameters.
    #[must_use]
    pub fn with_discovery(mut self, discovery: DiscoveryConfig) -> Self {
        self.discovery = discovery;
        self
    }

    /// Start with genesis data known.
    #[must_use]
    pub fn with_genesis(mut self, genesis: GenesisInfo) -> Self {
        self.genesis = Some(genesis);
        self
    }

    /// Bootstrap from these textual records.
    #[must_use]
    pub fn with_bootstrap_records(mut self, records: Vec<String>) -> Self {
        self.bootstrap = records;
        self
    }

    /// Use a fixed secret key.
    #[must_use]
    pub fn with_node_key(mut self, key: [u8; 32]) -> Self {
        self.node_key = Some(key);
        self
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn network_config(&self) -> NetworkConfig {
        self.network.clone()
    }

    fn discovery_config(&self) -> DiscoveryConfig {
        self.discovery.clone()
    }

    fn genesis(&self) -> Option<GenesisInfo> {
        self.genesis
    }

    fn bootstrap_records(&self) -> Vec<String> {
        self.bootstrap.clone()
    }

    fn node_key(&self) -> Option<[u8; 32]> {
        self.node_key
    }
}

// ============================================================================
// TomlConfigProvider - Config file loading (requires "network" feature)
// ============================================================================

#[cfg(feature = "network")]
mod toml_config {
    use std::collections::BTreeMap;
    use std::fs;
    use std::net::{IpAddr, SocketAddr};
    use std::path::Path;

    use serde::Deserialize;

    use super::*;
    use crate::adapters::discovery::MAX_RECORD_SIZE;
    use crate::domain::{
        ChainSpec, ConfigError, ForkSchedule, ForkVersion, Root, Timestamp, FAR_FUTURE_EPOCH,
        GENESIS_EPOCH,
    };

    /// Configuration file structure.
    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct ConfigFile {
        #[serde(default)]
        network: NetworkSection,
        #[serde(default)]
        discovery: DiscoverySection,
        #[serde(default)]
        chain: ChainSection,
        genesis: Option<GenesisSection>,
    }

    #[derive(Debug, Deserialize, Default)]
    #[serde(deny_unknown_fields)]
    struct NetworkSection {
        listen_addr: Option<String>,
        advertised_ip: Option<String>,
        tcp_port: Option<u16>,
        #[serde(default)]
        bootstrap: Vec<String>,
        node_key: Option<String>,
    }

    #[derive(Debug, Deserialize, Default)]
    #[serde(deny_unknown_fields)]
    struct DiscoverySection {
        k: Option<usize>,
        alpha: Option<usize>,
        request_timeout_ms: Option<u64>,
        max_lookup_rounds: Option<usize>,
        refresh_interval_secs: Option<u64>,
        max_record_size: Option<usize>,
    }

    #[derive(Debug, Deserialize, Default)]
    #[serde(deny_unknown_fields)]
    struct ChainSection {
        seconds_per_slot: Option<u64>,
        slots_per_epoch: Option<u64>,
        genesis_fork_version: Option<String>,
        #[serde(default)]
        forks: Vec<ForkEntry>,
        next_fork_epoch: Option<u64>,
        next_fork_version: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct ForkEntry {
        epoch: u64,
        version: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct GenesisSection {
        genesis_time: u64,
        genesis_validators_root: String,
    }

    /// TOML-based configuration provider.
    ///
    /// # Config File Format
    ///
    /// ```toml
    /// [network]
    /// listen_addr = "0.0.0.0:9000"
    /// advertised_ip = "203.0.113.7"
    /// tcp_port = 13000
    /// bootstrap = ["enr:..."]
    /// node_key = "0x..."            # optional, 32 bytes hex
    ///
    /// [discovery]
    /// k = 16
    /// alpha = 3
    /// request_timeout_ms = 500
    /// max_lookup_rounds = 8
    /// refresh_interval_secs = 12
    /// max_record_size = 300
    ///
    /// [chain]
    /// seconds_per_slot = 12
    /// slots_per_epoch = 32
    /// genesis_fork_version = "0x00000000"
    /// next_fork_epoch = 74240
    /// next_fork_version = "0x01000000"
    ///
    /// [[chain.forks]]
    /// epoch = 74240
    /// version = "0x01000000"
    ///
    /// [genesis]                      # omit to run pre-genesis
    /// genesis_time = 1606824023
    /// genesis_validators_root = "0x4b363db9..."
    /// ```
    #[derive(Debug, Clone)]
    pub struct TomlConfigProvider {
        network: NetworkConfig,
        discovery: DiscoveryConfig,
        genesis: Option<GenesisInfo>,
        bootstrap: Vec<String>,
        node_key: Option<[u8; 32]>,
    }

    impl TomlConfigProvider {
        /// Load configuration from a TOML file.
        ///
        /// # Errors
        ///
        /// Returns error if the file cannot be read, parsed or validated.
        pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
            let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
                path: path.as_ref().display().to_string(),
                error: e.to_string(),
            })?;

            Self::parse(&content)
        }

        /// Parse configuration from a TOML string.
        ///
        /// # Errors
        ///
        /// Malformed TOML, bad hex values, bad addresses, or an
        /// inconsistent fork schedule.
        pub fn parse(content: &str) -> Result<Self, ConfigError> {
            let file: ConfigFile =
                toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

            let network = build_network_config(file.chain)?;
            let discovery = build_discovery_config(&file.network, file.discovery)?;

            let genesis = file
                .genesis
                .map(|g| -> Result<GenesisInfo, ConfigError> {
                    Ok(GenesisInfo::new(
                        Timestamp::new(g.genesis_time),
                        Root(parse_hex_array("genesis_validators_root", &g.genesis_validators_root)?),
                    ))
                })
                .transpose()?;

            let node_key = file
                .network
                .node_key
                .as_deref()
                .map(|k| parse_hex_array("node_key", k))
                .transpose()?;

            Ok(Self {
                network,
                discovery,
                genesis,
                bootstrap: file.network.bootstrap,
                node_key,
            })
        }
    }

    fn build_network_config(chain: ChainSection) -> Result<NetworkConfig, ConfigError> {
        let defaults = ChainSpec::default();
        let spec = ChainSpec::new(
            chain.seconds_per_slot.unwrap_or(defaults.seconds_per_slot),
            chain.slots_per_epoch.unwrap_or(defaults.slots_per_epoch),
        )?;

        let genesis_version = match chain.genesis_fork_version.as_deref() {
            Some(v) => ForkVersion(parse_hex_array("genesis_fork_version", v)?),
            None => ForkVersion::default(),
        };

        let mut versions = BTreeMap::from([(GENESIS_EPOCH, genesis_version)]);
        for fork in &chain.forks {
            let version = ForkVersion(parse_hex_array("chain.forks.version", &fork.version)?);
            // Epoch 0 may repeat the genesis entry; the schedule checks it agrees.
            let previous = versions.insert(fork.epoch, version);
            if fork.epoch != GENESIS_EPOCH && previous.is_some() {
                return Err(ConfigError::InvalidSchedule(format!(
                    "epoch {} listed twice",
                    fork.epoch
                )));
            }
        }

        let next_fork_epoch = chain.next_fork_epoch.unwrap_or(FAR_FUTURE_EPOCH);
        let next_fork_version = match chain.next_fork_version.as_deref() {
            Some(v) => ForkVersion(parse_hex_array("next_fork_version", v)?),
            None => genesis_version,
        };

        let schedule =
            ForkSchedule::new(genesis_version, versions, next_fork_epoch, next_fork_version)?;
        Ok(NetworkConfig::new(schedule, spec))
    }

    fn build_discovery_config(
        network: &NetworkSection,
        discovery: DiscoverySection,
    ) -> Result<DiscoveryConfig, ConfigError> {
        let defaults = DiscoveryConfig::default();

        let listen_addr = match network.listen_addr.as_deref() {
            Some(s) => s
                .parse::<SocketAddr>()
                .map_err(|_| ConfigError::InvalidAddress(s.to_string()))?,
            None => defaults.listen_addr,
        };
        let advertised_ip = network
            .advertised_ip
            .as_deref()
            .map(|s| {
                s.parse::<IpAddr>()
                    .map_err(|_| ConfigError::InvalidAddress(s.to_string()))
            })
            .transpose()?;

        let config = DiscoveryConfig {
            listen_addr,
            advertised_ip,
            tcp_port: network.tcp_port.unwrap_or(defaults.tcp_port),
            k: discovery.k.unwrap_or(defaults.k),
            alpha: discovery.alpha.unwrap_or(defaults.alpha),
            request_timeout_ms: discovery
                .request_timeout_ms
                .unwrap_or(defaults.request_timeout_ms),
            max_lookup_rounds: discovery
                .max_lookup_rounds
                .unwrap_or(defaults.max_lookup_rounds),
            refresh_interval_secs: discovery
                .refresh_interval_secs
                .unwrap_or(defaults.refresh_interval_secs),
            max_record_size: discovery.max_record_size.unwrap_or(defaults.max_record_size),
        };
        check_discovery_config(&config)?;
        Ok(config)
    }

    fn check_discovery_config(config: &DiscoveryConfig) -> Result<(), ConfigError> {
        let out_of_range =
            |field: &'static str, reason: String| ConfigError::InvalidDiscovery { field, reason };

        if config.k == 0 {
            return Err(out_of_range("k", "must be at least 1".to_string()));
        }
        if config.alpha == 0 {
            return Err(out_of_range("alpha", "must be at least 1".to_string()));
        }
        if config.max_lookup_rounds == 0 {
            return Err(out_of_range("max_lookup_rounds", "must be at least 1".to_string()));
        }
        if config.request_timeout_ms == 0 {
            return Err(out_of_range("request_timeout_ms", "must be at least 1".to_string()));
        }
        if config.refresh_interval_secs == 0 {
            return Err(out_of_range("refresh_interval_secs", "must be at least 1".to_string()));
        }
        if config.max_record_size == 0 || config.max_record_size > MAX_RECORD_SIZE {
            return Err(out_of_range(
                "max_record_size",
                format!("must be between 1 and {MAX_RECORD_SIZE}"),
            ));
        }
        Ok(())
    }

    /// Parse `0x`-prefixed (or bare) hex of exactly `N` bytes.
    fn parse_hex_array<const N: usize>(
        field: &'static str,
        value: &str,
    ) -> Result<[u8; N], ConfigError> {
        let trimmed = value.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(digits).map_err(|e| ConfigError::InvalidHex {
            field,
            reason: e.to_string(),
        })?;
        let len = bytes.len();
        bytes.try_into().map_err(|_| ConfigError::InvalidHex {
            field,
            reason: format!("expected {N} bytes, got {len}"),
        })
    }

    impl ConfigProvider for TomlConfigProvider {
        fn network_config(&self) -> NetworkConfig {
            self.network.clone()
        }

        fn discovery_config(&self) -> DiscoveryConfig {
            self.discovery.clone()
        }

        fn genesis(&self) -> Option<GenesisInfo> {
            self.genesis
        }

        fn bootstrap_records(&self) -> Vec<String> {
            self.bootstrap.clone()
        }

        fn node_key(&self) -> Option<[u8; 32]> {
            self.node_key
        }
    }
}

#[cfg(feature = "network")]
pub use toml_config::TomlConfigProvider;
