//! Network selection.
//!
//! Networks are described in an optional TOML file. Command line flags and
//! environment variables override individual fields of the selected network.

use {
    alloy::signers::local::PrivateKeySigner,
    anyhow::{Context, Result, anyhow},
    serde::Deserialize,
    std::{collections::BTreeMap, num::NonZeroU64, path::Path},
    tokio::fs,
    url::Url,
};

pub const DEFAULT_CONFIG_FILE: &str = "deploy.toml";
pub const LOCALHOST: &str = "localhost";
const LOCALHOST_URL: &str = "http://127.0.0.1:8545";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Network used when none is selected explicitly.
    pub default_network: Option<String>,

    #[serde(default)]
    pub networks: BTreeMap<String, NetworkFile>,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct NetworkFile {
    /// JSON-RPC endpoint of the node.
    pub url: Url,

    /// Chain ID the node is expected to report. Deployments to a node
    /// reporting a different chain are refused.
    pub chain_id: Option<u64>,

    /// Hex encoded key signing the deployment. Without one the first account
    /// unlocked on the node is used.
    pub private_key: Option<String>,

    /// Number of blocks, including the one containing the deployment, to
    /// wait for.
    pub confirmations: Option<NonZeroU64>,
}

impl std::fmt::Debug for NetworkFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkFile")
            .field("url", &self.url.as_str())
            .field("chain_id", &self.chain_id)
            .field("private_key", &self.private_key.as_ref().map(|_| "SECRET"))
            .field("confirmations", &self.confirmations)
            .finish()
    }
}

/// Values taking precedence over the configuration file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub network: Option<String>,
    pub node_url: Option<Url>,
    pub private_key: Option<String>,
    pub confirmations: Option<NonZeroU64>,
}

/// The fully resolved network a deployment goes to.
#[derive(Debug, Clone)]
pub struct Network {
    pub name: String,
    pub url: Url,
    pub chain_id: Option<u64>,
    pub signer: Option<PrivateKeySigner>,
    pub confirmations: u64,
}

impl Config {
    /// Reads the configuration file at `path`. When `explicit` is false a
    /// missing file yields the empty configuration.
    pub async fn load(path: &Path, explicit: bool) -> Result<Self> {
        let data = match fs::read_to_string(path).await {
            Ok(data) => data,
            Err(err) if !explicit && err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(?path, "no configuration file, using built-in networks");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read configuration {path:?}"));
            }
        };
        Self::parse(&data).with_context(|| format!("invalid configuration {path:?}"))
    }

    pub fn parse(data: &str) -> Result<Self> {
        // Not printing detailed error because it could leak private keys.
        toml::de::from_str(data).map_err(|_| anyhow!("TOML syntax error"))
    }

    /// Picks the network to deploy to and applies `overrides` on top of it.
    pub fn network(&self, overrides: Overrides) -> Result<Network> {
        let name = overrides
            .network
            .or_else(|| self.default_network.clone())
            .unwrap_or_else(|| LOCALHOST.to_string());

        let file = match self.networks.get(&name) {
            Some(file) => file.clone(),
            None if name == LOCALHOST => localhost()?,
            None => {
                let known = self
                    .networks
                    .keys()
                    .map(String::as_str)
                    .chain((!self.networks.contains_key(LOCALHOST)).then_some(LOCALHOST))
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(anyhow!("unknown network {name:?}, known networks: {known}"));
            }
        };

        let signer = overrides
            .private_key
            .or(file.private_key)
            .map(|key| {
                key.trim()
                    .parse::<PrivateKeySigner>()
                    // The parse error would echo the key.
                    .map_err(|_| anyhow!("invalid private key for network {name:?}"))
            })
            .transpose()?;

        Ok(Network {
            url: overrides.node_url.unwrap_or(file.url),
            chain_id: file.chain_id,
            signer,
            confirmations: overrides
                .confirmations
                .or(file.confirmations)
                .map_or(1, NonZeroU64::get),
            name,
        })
    }
}

fn localhost() -> Result<NetworkFile> {
    Ok(NetworkFile {
        url: LOCALHOST_URL.parse()?,
        chain_id: None,
        private_key: None,
        confirmations: None,
    })
}
