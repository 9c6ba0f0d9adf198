pub mod arguments;
pub mod artifact;
pub mod config;
pub mod ethereum;
pub mod toolchain;

use {
    crate::{
        artifact::ArtifactStore,
        config::Config,
        ethereum::EthereumToolchain,
        toolchain::{DeploymentError, Toolchain},
    },
    alloy::primitives::{Address, B256},
    std::fmt::{self, Display, Formatter},
};

/// The outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub contract: String,
    pub address: Address,
    pub tx_hash: B256,
}

impl Display for Deployment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} deployed to: {}", self.contract, self.address)
    }
}

/// Resolves `contract`, deploys a new instance of it and waits for the
/// deployment to be confirmed.
///
/// Every call submits a new transaction and therefore creates a new contract
/// instance. Nothing is submitted if the artifact can't be resolved.
pub async fn run(
    toolchain: &dyn Toolchain,
    contract: &str,
) -> Result<Deployment, DeploymentError> {
    let artifact = toolchain.contract_artifact(contract).await?;
    tracing::info!(
        contract = %artifact.fully_qualified_name(),
        bytecode_len = artifact.bytecode.len(),
        "resolved contract artifact"
    );

    let pending = toolchain.deploy(&artifact).await?;
    tracing::info!(tx_hash = %pending.tx_hash, "waiting for deployment to be confirmed");

    let confirmed = toolchain.confirm(pending).await?;
    tracing::info!(
        address = %confirmed.address,
        block = ?confirmed.block_number,
        "deployment confirmed"
    );

    Ok(Deployment {
        contract: artifact.contract_name,
        address: confirmed.address,
        tx_hash: confirmed.tx_hash,
    })
}

/// Builds the production toolchain from `args` and runs the deployment.
pub async fn start(args: arguments::Arguments) -> anyhow::Result<Deployment> {
    let (path, explicit) = args.config_file();
    let network = Config::load(&path, explicit)
        .await?
        .network(args.overrides())?;
    tracing::info!(network = %network.name, url = %network.url, "selected network");

    let toolchain = EthereumToolchain::new(ArtifactStore::new(&args.artifacts), &network);
    Ok(run(&toolchain, &args.contract).await?)
}
