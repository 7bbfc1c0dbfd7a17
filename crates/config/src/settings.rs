// Copyright (C) 2015-2025 The Neo Project.
//
// settings.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Per-network protocol settings and the node application configuration.

use crate::{ConfigError, ConfigResult, Hardfork};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The networks this node knows presets for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NetworkType {
    MainNet,
    #[default]
    TestNet,
    PrivNet,
}

impl NetworkType {
    /// The network magic carried in every P2P handshake.
    pub fn magic(&self) -> u32 {
        match self {
            NetworkType::MainNet => 0x334F_454E,
            NetworkType::TestNet => 0x3254_334E,
            NetworkType::PrivNet => 0x0000_004E,
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkType::MainNet => write!(f, "mainnet"),
            NetworkType::TestNet => write!(f, "testnet"),
            NetworkType::PrivNet => write!(f, "privnet"),
        }
    }
}

impl FromStr for NetworkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Ok(NetworkType::MainNet),
            "testnet" | "test" => Ok(NetworkType::TestNet),
            "privnet" | "private" => Ok(NetworkType::PrivNet),
            other => Err(format!("unknown network: {other}")),
        }
    }
}

/// Protocol-level settings shared by every node on a network.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProtocolSettings {
    /// Network magic number.
    pub network: u32,
    /// Version byte prepended to script hashes when forming addresses.
    pub address_version: u8,
    /// Target interval between blocks.
    pub milliseconds_per_block: u64,
    /// Maximum number of transactions the primary packs into one block.
    pub max_transactions_per_block: u32,
    /// Memory pool capacity.
    pub memory_pool_max_transactions: usize,
    /// How far back blocks and transactions stay addressable.
    pub max_traceable_blocks: u32,
    /// GAS (in datoshi) minted to the committee in the genesis block.
    pub initial_gas_distribution: i64,
    /// Number of consensus validators drawn from the committee.
    pub validators_count: usize,
    /// Compressed public keys of the standby committee, hex encoded.
    pub standby_committee: Vec<String>,
    /// Addresses used to bootstrap peer discovery.
    pub seed_list: Vec<String>,
    /// Hardfork activation heights; omitted forks never activate.
    pub hardforks: BTreeMap<Hardfork, u32>,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self::privnet()
    }
}

/// The seven standby validators shared by the well-known networks.
const STANDBY_VALIDATORS: [&str; 7] = [
    "03b209fd4f53a7170ea4444e0cb0a6bb6a53c2bd016926989cf85f9b0fba17a70c",
    "02df48f60e8f3e01c48ff40b9b7f1310d7a8b2a193188befe1c2e3df740e895093",
    "03b8d9d5771d8f513aa0869b9cc8d50986403b78c6da36890638c3d46a5adce04a",
    "02ca0e27697b9c248f6f16e085fd0061e26f44da85b58ee835c110caa5ec3ba554",
    "024c7b7fb6c310fccf1ba33b082519d82964ea93868d676662d4a59ad548df0e7d",
    "02aaec38470f6aad0042c6e877cfb8087d2a7c5dbb588c45ec57e04946360614ae",
    "02486fd15702c4490a26703112a5cc1d0923fd697a33406bd5a1c00e0013b09a70",
];

impl ProtocolSettings {
    /// Mainnet preset.
    ///
    /// TODO: extend the committee list to the full 21 mainnet members; the
    /// preset currently carries the seven standby validators only.
    pub fn mainnet() -> Self {
        Self {
            network: NetworkType::MainNet.magic(),
            address_version: 0x35,
            milliseconds_per_block: 15_000,
            max_transactions_per_block: 512,
            memory_pool_max_transactions: 50_000,
            max_traceable_blocks: 2_102_400,
            initial_gas_distribution: 5_200_000_000_000_000,
            validators_count: 7,
            standby_committee: STANDBY_VALIDATORS.iter().map(|s| s.to_string()).collect(),
            seed_list: vec![
                "seed1.neo.org:10333".into(),
                "seed2.neo.org:10333".into(),
                "seed3.neo.org:10333".into(),
                "seed4.neo.org:10333".into(),
                "seed5.neo.org:10333".into(),
            ],
            hardforks: BTreeMap::new(),
        }
    }

    /// Testnet preset.
    pub fn testnet() -> Self {
        Self {
            network: NetworkType::TestNet.magic(),
            seed_list: vec![
                "seed1t.neo.org:20333".into(),
                "seed2t.neo.org:20333".into(),
                "seed3t.neo.org:20333".into(),
                "seed4t.neo.org:20333".into(),
                "seed5t.neo.org:20333".into(),
            ],
            ..Self::mainnet()
        }
    }

    /// Single-machine private network preset: one validator, fast blocks,
    /// every hardfork active from genesis.
    pub fn privnet() -> Self {
        Self {
            network: NetworkType::PrivNet.magic(),
            address_version: 0x35,
            milliseconds_per_block: 1_000,
            max_transactions_per_block: 512,
            memory_pool_max_transactions: 50_000,
            max_traceable_blocks: 2_102_400,
            initial_gas_distribution: 5_200_000_000_000_000,
            validators_count: 1,
            standby_committee: vec![STANDBY_VALIDATORS[0].to_string()],
            seed_list: Vec::new(),
            hardforks: Hardfork::ALL.iter().map(|hf| (*hf, 0)).collect(),
        }
    }

    /// Preset for `network`.
    pub fn preset(network: NetworkType) -> Self {
        match network {
            NetworkType::MainNet => Self::mainnet(),
            NetworkType::TestNet => Self::testnet(),
            NetworkType::PrivNet => Self::privnet(),
        }
    }

    /// Number of committee members.
    pub fn committee_size(&self) -> usize {
        self.standby_committee.len()
    }

    /// Maximum distance between the current height and a transaction's
    /// `valid_until_block`, roughly one day of blocks.
    pub fn max_valid_until_block_increment(&self) -> u32 {
        (86_400_000 / self.milliseconds_per_block.max(1)) as u32
    }

    /// Whether `hardfork` is active at block `index`.
    pub fn is_hardfork_enabled(&self, hardfork: Hardfork, index: u32) -> bool {
        self.hardforks.get(&hardfork).is_some_and(|&h| index >= h)
    }

    /// Basic structural validation of the settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.standby_committee.is_empty() {
            return Err(ConfigError::Invalid("standby committee is empty".into()));
        }
        if self.validators_count == 0 || self.validators_count > self.standby_committee.len() {
            return Err(ConfigError::Invalid(format!(
                "validators count {} out of range for committee of {}",
                self.validators_count,
                self.standby_committee.len()
            )));
        }
        for key in &self.standby_committee {
            let bytes = hex::decode(key)
                .map_err(|_| ConfigError::Invalid(format!("committee key is not hex: {key}")))?;
            if bytes.len() != 33 {
                return Err(ConfigError::Invalid(format!(
                    "committee key is not a compressed point: {key}"
                )));
            }
        }
        Ok(())
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct StorageConfig {
    /// `"rocksdb"` or `"memory"`.
    pub engine: String,
    /// Database directory.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            engine: "rocksdb".into(),
            path: PathBuf::from("./data/chain"),
        }
    }
}

/// P2P listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct P2PConfig {
    pub port: u16,
    pub min_desired_connections: usize,
    pub max_connections: usize,
}

impl Default for P2PConfig {
    fn default() -> Self {
        Self {
            port: 10333,
            min_desired_connections: 10,
            max_connections: 40,
        }
    }
}

/// JSON-RPC server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RpcConfig {
    pub port: u16,
    /// Gas budget (in datoshi) for `invokefunction`/`invokescript`.
    pub max_gas_invoke: i64,
    /// Whether iterator sessions are kept between calls.
    pub session_enabled: bool,
    /// Idle seconds before an iterator session is dropped.
    pub session_expiration_time: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            port: 10332,
            max_gas_invoke: 100_000_000,
            session_enabled: true,
            session_expiration_time: 60,
        }
    }
}

/// Top-level node configuration file model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ApplicationConfig {
    pub protocol_configuration: ProtocolSettings,
    pub application_configuration: ApplicationSettings,
}

/// The `ApplicationConfiguration` section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ApplicationSettings {
    pub storage: StorageConfig,
    #[serde(rename = "P2P")]
    pub p2p: P2PConfig,
    #[serde(rename = "RPC")]
    pub rpc: RpcConfig,
}

impl ApplicationConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: ApplicationConfig = serde_json::from_str(&text)?;
        config.protocol_configuration.validate()?;
        Ok(config)
    }

    /// Default configuration for `network`.
    pub fn preset(network: NetworkType) -> Self {
        Self {
            protocol_configuration: ProtocolSettings::preset(network),
            application_configuration: ApplicationSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        ProtocolSettings::mainnet().validate().unwrap();
        ProtocolSettings::testnet().validate().unwrap();
        ProtocolSettings::privnet().validate().unwrap();
    }

    #[test]
    fn test_valid_until_increment() {
        let settings = ProtocolSettings::mainnet();
        assert_eq!(settings.max_valid_until_block_increment(), 5760);
    }

    #[test]
    fn test_hardfork_gate() {
        let mut settings = ProtocolSettings::mainnet();
        assert!(!settings.is_hardfork_enabled(Hardfork::Echidna, 100));
        settings.hardforks.insert(Hardfork::Echidna, 50);
        assert!(settings.is_hardfork_enabled(Hardfork::Echidna, 50));
        assert!(!settings.is_hardfork_enabled(Hardfork::Echidna, 49));
    }

    #[test]
    fn test_config_file_roundtrip() {
        let config = ApplicationConfig::preset(NetworkType::TestNet);
        let json = serde_json::to_string_pretty(&config).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, json).unwrap();

        let loaded = ApplicationConfig::load(&path).unwrap();
        assert_eq!(
            loaded.protocol_configuration.network,
            NetworkType::TestNet.magic()
        );
        assert_eq!(loaded.application_configuration.rpc.port, 10332);
    }

    #[test]
    fn test_invalid_committee_rejected() {
        let mut settings = ProtocolSettings::privnet();
        settings.standby_committee = vec!["zz".into()];
        assert!(settings.validate().is_err());
    }
}
