use meshkv_core::{Error, Result, Role};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Node configuration, assembled from CLI flags or a config file (§6).
/// `role` is validated eagerly — an out-of-range value is a fatal
/// configuration error, not something to default away from (§7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub name: String,
    pub group: String,
    pub role: i32,
    pub save_path: PathBuf,
    pub log_path: PathBuf,
    pub ip: Option<String>,
    pub scan: bool,
    pub min_node: i32,
    pub peers: Vec<String>,
    pub raft_port: u16,
    pub repl_port: u16,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            group: "default".to_string(),
            role: Role::AnyRole as i32,
            save_path: PathBuf::from("./data"),
            log_path: PathBuf::from("./log"),
            ip: None,
            scan: true,
            min_node: 1,
            peers: Vec::new(),
            raft_port: 7946,
            repl_port: 7947,
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| Error::FatalConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::FatalConfig(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// §4.1/§7: `Role` outside {0, 1, 2} is a fatal configuration error
    /// the node refuses to start with, rather than a silently-clamped
    /// default.
    pub fn validate(&self) -> Result<()> {
        if Role::from_i32(self.role).is_none() {
            return Err(Error::FatalConfig(format!(
                "role must be 0 (AnyRole), 1 (NeverLeader), or 2 (AlwaysFollower), got {}",
                self.role
            )));
        }
        if self.min_node < 1 {
            return Err(Error::FatalConfig("min_node must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn role(&self) -> Role {
        Role::from_i32(self.role).expect("validated at load time")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_role() {
        let mut config = NodeConfig::default();
        config.role = 99;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_min_node() {
        let mut config = NodeConfig::default();
        config.min_node = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_config_validates() {
        assert!(NodeConfig::default().validate().is_ok());
    }
}
