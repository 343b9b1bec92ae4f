//! Configuration management

use crate::{Error, Result};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server information
    pub server: ServerConfig,
    /// Protocol limits
    pub limits: LimitsConfig,
    /// Operator blocks
    pub operators: Vec<OperatorConfig>,
    /// Prefix mode rank overrides
    pub prefixes: Vec<PrefixConfig>,
    /// Module settings
    pub modules: ModuleConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server name
    pub name: String,
    /// Server description
    pub description: String,
    /// Network name
    pub network: String,
}

/// Protocol limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum number of applied mode changes announced in one MODE line
    pub max_modes: usize,
    /// Per-channel list mode size limits, first match wins
    pub max_list: Vec<ListLimitConfig>,
}

/// A list mode size limit for channels matching a glob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListLimitConfig {
    /// Channel name glob
    #[serde(default = "default_list_channel")]
    pub channel: String,
    /// List mode name this limit applies to; all list modes when absent
    #[serde(default)]
    pub mode: Option<String>,
    /// Maximum number of entries
    pub limit: usize,
}

fn default_list_channel() -> String {
    "*".to_string()
}

/// Operator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Operator account name
    pub name: String,
    /// Operator type shown in permission errors
    pub oper_type: String,
    /// Hostmask (ident@host glob) the operator must connect from
    #[serde(default = "default_hostmask")]
    pub hostmask: String,
    /// Channel mode letters this operator may use; `*` allows all
    #[serde(default)]
    pub chan_modes: String,
    /// User mode letters this operator may use; `*` allows all
    #[serde(default)]
    pub user_modes: String,
}

fn default_hostmask() -> String {
    "*@*".to_string()
}

/// Rank override for a prefix mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixConfig {
    /// Prefix mode name, e.g. `op`
    pub name: String,
    /// Rank granted by the prefix
    pub rank: Option<u32>,
    /// Rank required to grant the prefix
    pub set_rank: Option<u32>,
    /// Rank required to remove the prefix
    pub unset_rank: Option<u32>,
    /// Whether members may remove the prefix from themselves
    pub self_remove: Option<bool>,
}

/// Module settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Modules to load at startup, in order
    pub load: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "irc.localhost".to_string(),
            description: "Rust IRC Daemon".to_string(),
            network: "LocalNet".to_string(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_modes: 20,
            max_list: vec![ListLimitConfig {
                channel: "*".to_string(),
                mode: None,
                limit: 100,
            }],
        }
    }
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            load: vec![
                "chanmodes".to_string(),
                "prefixes".to_string(),
                "listmodes".to_string(),
                "usermodes".to_string(),
            ],
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
        let config: Config = toml::from_str(&content)?;
        tracing::debug!("Loaded configuration from {:?}", path.as_ref());
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.name.is_empty() {
            return Err(Error::Config("Server name cannot be empty".to_string()));
        }
        if self.server.name.contains(' ') {
            return Err(Error::Config("Server name cannot contain spaces".to_string()));
        }

        if self.limits.max_modes == 0 {
            return Err(Error::Config("limits.max_modes must be at least 1".to_string()));
        }

        for entry in &self.limits.max_list {
            if entry.channel.is_empty() {
                return Err(Error::Config("max_list channel glob cannot be empty".to_string()));
            }
        }

        let mut seen_opers = FxHashSet::default();
        for oper in &self.operators {
            if oper.name.is_empty() {
                return Err(Error::Config("Operator name cannot be empty".to_string()));
            }
            if !seen_opers.insert(oper.name.to_lowercase()) {
                return Err(Error::Config(format!("Duplicate operator {}", oper.name)));
            }
        }

        let mut seen_prefixes = FxHashSet::default();
        for prefix in &self.prefixes {
            if !seen_prefixes.insert(prefix.name.as_str()) {
                return Err(Error::Config(format!("Duplicate prefix override {}", prefix.name)));
            }
            if let (Some(rank), Some(set_rank)) = (prefix.rank, prefix.set_rank) {
                if set_rank < rank / 2 {
                    tracing::warn!(
                        "Prefix {} can be granted by members ranked {} which is far below its own rank {}",
                        prefix.name,
                        set_rank,
                        rank
                    );
                }
            }
        }

        Ok(())
    }

    /// Find the operator block with the given name
    pub fn find_operator(&self, name: &str) -> Option<&OperatorConfig> {
        self.operators.iter().find(|o| o.name.eq_ignore_ascii_case(name))
    }

    /// Find the rank override for a prefix mode
    pub fn prefix_override(&self, name: &str) -> Option<&PrefixConfig> {
        self.prefixes.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.limits.max_modes, 20);
    }

    #[test]
    fn test_zero_max_modes_rejected() {
        let mut config = Config::default();
        config.limits.max_modes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modeircd.toml");

        let mut config = Config::default();
        config.limits.max_modes = 3;
        config.operators.push(OperatorConfig {
            name: "root".to_string(),
            oper_type: "NetAdmin".to_string(),
            hostmask: "*@*".to_string(),
            chan_modes: "*".to_string(),
            user_modes: "*".to_string(),
        });
        config.to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.limits.max_modes, 3);
        assert_eq!(loaded.find_operator("ROOT").map(|o| o.oper_type.as_str()), Some("NetAdmin"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r##"
            [server]
            name = "irc.example.net"

            [[limits.max_list]]
            channel = "#big*"
            mode = "ban"
            limit = 500
            "##,
        )
        .unwrap();
        assert_eq!(config.server.name, "irc.example.net");
        assert_eq!(config.limits.max_modes, 20);
        assert_eq!(config.limits.max_list[0].limit, 500);
        assert_eq!(config.modules.load.len(), 4);
    }
}
