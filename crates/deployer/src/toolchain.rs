//! The capability the deployer is written against.
//!
//! Resolving artifacts, submitting transactions and waiting for receipts are
//! all owned by external systems. The deployer only sequences them, which
//! keeps it testable against a mocked toolchain.

use {
    alloy::{
        json_abi::JsonAbi,
        primitives::{Address, B256, Bytes},
        rpc::types::TransactionRequest,
    },
    thiserror::Error,
};

/// A compiled contract as produced by the Solidity toolchain.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractArtifact {
    pub contract_name: String,
    /// Path of the source file relative to the project root, e.g.
    /// `contracts/CryptexSphere.sol`.
    pub source_name: String,
    pub abi: JsonAbi,
    /// Creation bytecode. Never empty for artifacts handed out by a toolchain.
    pub bytecode: Bytes,
}

impl ContractArtifact {
    /// `<source>:<contract>`, unique across a project.
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }
}

/// A deployment transaction that was accepted by the node but whose outcome
/// is not known yet.
#[derive(Debug, Clone)]
pub struct PendingDeployment {
    pub tx_hash: B256,
    /// The request the transaction was built from. Kept around so a reverted
    /// deployment can be replayed to recover the revert reason.
    pub request: TransactionRequest,
}

/// A deployment transaction that was included on chain and succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedDeployment {
    pub address: Address,
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("artifact for contract {name:?} not found")]
    ArtifactNotFound {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to submit deployment transaction")]
    Submission(#[source] anyhow::Error),

    #[error("deployment transaction {tx_hash} failed")]
    Confirmation {
        tx_hash: B256,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Toolchain: Send + Sync {
    /// Looks up the compiled artifact of the contract called `name`.
    async fn contract_artifact(&self, name: &str) -> Result<ContractArtifact, DeploymentError>;

    /// Submits a transaction creating a new instance of `artifact` without
    /// constructor arguments. Returns as soon as the node accepted it.
    async fn deploy(
        &self,
        artifact: &ContractArtifact,
    ) -> Result<PendingDeployment, DeploymentError>;

    /// Waits until `pending` is confirmed. Does not time out.
    async fn confirm(
        &self,
        pending: PendingDeployment,
    ) -> Result<ConfirmedDeployment, DeploymentError>;
}
