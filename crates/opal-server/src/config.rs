use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use opal_types::ByteString;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Hex-encoded ledger namespace accepted by this instance.
    pub namespace: String,
    #[serde(default)]
    pub validator: ValidatorConfig,
    /// Anchoring is off unless this section is present.
    #[serde(default)]
    pub anchoring: Option<AnchoringConfig>,
}

impl ServerConfig {
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|error| ServerError::Config(error.to_string()))
    }

    pub fn namespace_bytes(&self) -> ServerResult<ByteString> {
        ByteString::from_hex(&self.namespace)
            .map_err(|_| ServerError::Config(format!("namespace is not valid hex: {}", self.namespace)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".parse().expect("valid literal address"),
            // "opal" in hex
            namespace: "6f70616c".to_string(),
            validator: ValidatorConfig::default(),
            anchoring: None,
        }
    }
}

/// Which rules strategy the instance runs. Exactly one is active per
/// deployment, selected once at process start.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ValidatorConfig {
    PermissionBased {
        /// Hex public keys with full rights over the whole tree.
        #[serde(default)]
        admin_keys: Vec<String>,
        #[serde(default)]
        issuers: Vec<IssuerConfig>,
        #[serde(default)]
        allow_third_party_assets: bool,
    },
    Admin {
        admin_keys: Vec<String>,
    },
    /// Observer instance: queries only, no submissions accepted.
    Disabled,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig::PermissionBased {
            admin_keys: Vec::new(),
            issuers: Vec::new(),
            allow_third_party_assets: false,
        }
    }
}

/// One configured asset issuer: the asset subtree and the hex public keys
/// allowed to issue under it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IssuerConfig {
    pub path: String,
    pub keys: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnchoringConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,
}

fn default_poll_interval() -> u64 {
    10
}

fn default_error_backoff() -> u64 {
    60
}
