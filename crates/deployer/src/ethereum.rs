//! [`Toolchain`] backed by a Hardhat artifacts directory and a JSON-RPC node.

use {
    crate::{
        artifact::ArtifactStore,
        config::Network,
        toolchain::{
            ConfirmedDeployment,
            ContractArtifact,
            DeploymentError,
            PendingDeployment,
            Toolchain,
        },
    },
    alloy::{
        eips::BlockId,
        network::{EthereumWallet, ReceiptResponse, TransactionBuilder},
        primitives::{Address, Bytes, U256},
        providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
        rpc::types::{TransactionReceipt, TransactionRequest},
        sol_types::decode_revert_reason,
        transports::TransportError,
    },
    anyhow::{Context, Result, anyhow, ensure},
};

pub struct EthereumToolchain {
    artifacts: ArtifactStore,
    provider: DynProvider,
    /// Address of the local signer. `None` means the node signs with its
    /// first unlocked account.
    sender: Option<Address>,
    chain_id: Option<u64>,
    confirmations: u64,
}

impl EthereumToolchain {
    /// Creates a toolchain for `network`. Does not contact the node yet.
    pub fn new(artifacts: ArtifactStore, network: &Network) -> Self {
        let builder = ProviderBuilder::new();
        let (provider, sender) = match &network.signer {
            Some(signer) => (
                builder
                    .wallet(EthereumWallet::new(signer.clone()))
                    .connect_http(network.url.clone())
                    .erased(),
                Some(signer.address()),
            ),
            None => (builder.connect_http(network.url.clone()).erased(), None),
        };
        Self::with_provider(
            artifacts,
            provider,
            sender,
            network.chain_id,
            network.confirmations,
        )
    }

    pub fn with_provider(
        artifacts: ArtifactStore,
        provider: DynProvider,
        sender: Option<Address>,
        chain_id: Option<u64>,
        confirmations: u64,
    ) -> Self {
        Self {
            artifacts,
            provider,
            sender,
            chain_id,
            confirmations,
        }
    }

    async fn sender(&self) -> Result<Address> {
        if let Some(sender) = self.sender {
            return Ok(sender);
        }
        self.provider
            .get_accounts()
            .await
            .context("failed to list node accounts")?
            .into_iter()
            .next()
            .context("no private key configured and the node has no unlocked accounts")
    }

    async fn check_chain_id(&self) -> Result<u64> {
        let actual = self
            .provider
            .get_chain_id()
            .await
            .context("failed to query chain id")?;
        if let Some(expected) = self.chain_id {
            ensure!(
                actual == expected,
                "network is configured for chain id {expected} but the node reports {actual}"
            );
        }
        Ok(actual)
    }

    async fn submit(&self, bytecode: Bytes) -> Result<PendingDeployment> {
        let chain_id = self.check_chain_id().await?;
        let sender = self.sender().await?;
        let balance = self
            .provider
            .get_balance(sender)
            .await
            .context("failed to query deployer balance")?;
        if balance == U256::ZERO {
            tracing::warn!(%sender, "deployer account has no funds");
        }
        tracing::info!(chain_id, %sender, %balance, "deploying from account");

        let request = TransactionRequest::default()
            .with_from(sender)
            .with_deploy_code(bytecode);
        let pending = self
            .provider
            .send_transaction(request.clone())
            .await
            .context("node rejected the deployment transaction")?;
        Ok(PendingDeployment {
            tx_hash: *pending.tx_hash(),
            request,
        })
    }

    /// Replays the creation at the block it reverted in to find out why.
    async fn revert_reason(&self, pending: &PendingDeployment, block: Option<u64>) -> String {
        let block = block.map(BlockId::number).unwrap_or_else(BlockId::latest);
        match self.provider.call(pending.request.clone()).block(block).await {
            Ok(_) => "reverted, replaying the transaction did not reproduce the revert".into(),
            Err(err) => revert_message(&err),
        }
    }

    /// Turns the receipt of a mined deployment into its outcome.
    async fn check_receipt(
        &self,
        pending: &PendingDeployment,
        receipt: &TransactionReceipt,
    ) -> Result<ConfirmedDeployment> {
        if !receipt.status() {
            let reason = self.revert_reason(pending, receipt.block_number()).await;
            return Err(anyhow!("transaction reverted: {reason}"));
        }
        let address = receipt
            .contract_address()
            .context("receipt does not contain a contract address")?;

        Ok(ConfirmedDeployment {
            address,
            tx_hash: pending.tx_hash,
            block_number: receipt.block_number(),
        })
    }
}

#[async_trait::async_trait]
impl Toolchain for EthereumToolchain {
    async fn contract_artifact(&self, name: &str) -> Result<ContractArtifact, DeploymentError> {
        let artifacts = self.artifacts.clone();
        let lookup = name.to_string();
        tokio::task::spawn_blocking(move || artifacts.find(&lookup))
            .await
            .map_err(anyhow::Error::from)
            .and_then(|found| found)
            .map_err(|source| DeploymentError::ArtifactNotFound {
                name: name.to_string(),
                source,
            })
    }

    async fn deploy(
        &self,
        artifact: &ContractArtifact,
    ) -> Result<PendingDeployment, DeploymentError> {
        self.submit(artifact.bytecode.clone())
            .await
            .map_err(DeploymentError::Submission)
    }

    async fn confirm(
        &self,
        pending: PendingDeployment,
    ) -> Result<ConfirmedDeployment, DeploymentError> {
        let tx_hash = pending.tx_hash;
        let failed = |source: anyhow::Error| DeploymentError::Confirmation { tx_hash, source };

        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .with_required_confirmations(self.confirmations)
            .get_receipt()
            .await
            .map_err(|err| failed(err.into()))?;

        self.check_receipt(&pending, &receipt).await.map_err(failed)
    }
}

/// Decodes the revert reason carried by a failed `eth_call`, falling back to
/// the node's error message.
fn revert_message(err: &TransportError) -> String {
    err.as_error_resp()
        .and_then(|payload| payload.as_revert_data())
        .map(|data| decode_revert_data(&data))
        .unwrap_or_else(|| err.to_string())
}

fn decode_revert_data(data: &[u8]) -> String {
    if data.is_empty() {
        return "reverted without reason".to_string();
    }
    decode_revert_reason(data)
        .filter(|reason| !reason.is_empty())
        .unwrap_or_else(|| format!("reverted with data {}", Bytes::copy_from_slice(data)))
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::{
            primitives::B256,
            providers::mock::Asserter,
            rpc::json_rpc::ErrorPayload,
            sol_types::{Panic, Revert, SolError},
        },
        serde_json::json,
    };

    fn toolchain(
        asserter: Asserter,
        sender: Option<Address>,
        chain_id: Option<u64>,
    ) -> EthereumToolchain {
        // No fillers, so every request hits the mocked responses in order.
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_mocked_client(asserter)
            .erased();
        EthereumToolchain::with_provider(
            ArtifactStore::new("does-not-exist"),
            provider,
            sender,
            chain_id,
            1,
        )
    }

    fn artifact() -> ContractArtifact {
        ContractArtifact {
            contract_name: "CryptexSphere".into(),
            source_name: "contracts/CryptexSphere.sol".into(),
            abi: Default::default(),
            bytecode: Bytes::from_static(&[0x60, 0x80]),
        }
    }

    fn pending() -> PendingDeployment {
        PendingDeployment {
            tx_hash: B256::repeat_byte(7),
            request: TransactionRequest::default()
                .with_from(Address::repeat_byte(1))
                .with_deploy_code(artifact().bytecode),
        }
    }

    fn receipt(status: bool, contract_address: Option<Address>) -> TransactionReceipt {
        serde_json::from_value(json!({
            "transactionHash": B256::repeat_byte(7),
            "transactionIndex": "0x0",
            "blockHash": B256::repeat_byte(2),
            "blockNumber": "0x2a",
            "from": Address::repeat_byte(1),
            "to": null,
            "contractAddress": contract_address,
            "gasUsed": "0x5208",
            "cumulativeGasUsed": "0x5208",
            "effectiveGasPrice": "0x3b9aca00",
            "logs": [],
            "logsBloom": format!("0x{}", "00".repeat(256)),
            "status": if status { "0x1" } else { "0x0" },
            "type": "0x2",
        }))
        .unwrap()
    }

    fn reverted_call(reason: &str) -> ErrorPayload {
        let data = Bytes::from(
            Revert {
                reason: reason.into(),
            }
            .abi_encode(),
        );
        serde_json::from_value(json!({
            "code": 3,
            "message": "execution reverted",
            "data": data,
        }))
        .unwrap()
    }

    #[test]
    fn decodes_error_string() {
        let data = Revert {
            reason: "CryptexSphere: paused".into(),
        }
        .abi_encode();
        assert!(decode_revert_data(&data).contains("CryptexSphere: paused"));
    }

    #[test]
    fn decodes_panic() {
        let data = Panic {
            code: U256::from(0x12),
        }
        .abi_encode();
        assert!(decode_revert_data(&data).contains("division or modulo by zero"));
    }

    #[test]
    fn undecodable_revert_data() {
        assert_eq!(decode_revert_data(&[]), "reverted without reason");
        assert_eq!(
            decode_revert_data(&[0xde, 0xad]),
            "reverted with data 0xdead"
        );
    }

    #[test]
    fn revert_message_from_error_response() {
        let err = TransportError::ErrorResp(reverted_call("CryptexSphere: paused"));
        assert!(revert_message(&err).contains("CryptexSphere: paused"));

        let err = TransportError::ErrorResp(ErrorPayload::internal_error_message(
            "connection reset".into(),
        ));
        assert!(revert_message(&err).contains("connection reset"));
    }

    #[tokio::test]
    async fn missing_artifact_maps_to_artifact_not_found() {
        let toolchain = toolchain(Asserter::new(), None, None);
        let err = toolchain
            .contract_artifact("CryptexSphere")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DeploymentError::ArtifactNotFound { ref name, .. } if name == "CryptexSphere"
        ));
    }

    #[tokio::test]
    async fn submits_creation_transaction() {
        let asserter = Asserter::new();
        asserter.push_success(&U256::from(31337));
        asserter.push_success(&U256::from(10).pow(U256::from(18)));
        asserter.push_success(&B256::repeat_byte(7));
        let toolchain = toolchain(asserter, Some(Address::repeat_byte(1)), Some(31337));

        let pending = toolchain.deploy(&artifact()).await.unwrap();
        assert_eq!(pending.tx_hash, B256::repeat_byte(7));
        assert_eq!(pending.request.from, Some(Address::repeat_byte(1)));
        assert_eq!(pending.request.to, Some(alloy::primitives::TxKind::Create));
        assert_eq!(pending.request.input.input(), Some(&artifact().bytecode));
    }

    #[tokio::test]
    async fn node_failure_is_a_submission_error() {
        let asserter = Asserter::new();
        asserter.push_failure_msg("connection refused");
        let toolchain = toolchain(asserter, Some(Address::repeat_byte(1)), None);

        let err = toolchain.deploy(&artifact()).await.unwrap_err();
        assert!(matches!(err, DeploymentError::Submission(_)));
        assert!(format!("{:?}", anyhow::Error::from(err)).contains("connection refused"));
    }

    #[tokio::test]
    async fn chain_id_mismatch_is_a_submission_error() {
        let asserter = Asserter::new();
        asserter.push_success(&U256::from(1));
        let toolchain = toolchain(asserter, Some(Address::repeat_byte(1)), Some(31337));

        let err = toolchain.deploy(&artifact()).await.unwrap_err();
        let DeploymentError::Submission(source) = err else {
            panic!("unexpected error {err:?}");
        };
        assert!(source.to_string().contains("chain id 31337"));
    }

    #[tokio::test]
    async fn node_without_accounts_is_a_submission_error() {
        let asserter = Asserter::new();
        asserter.push_success(&U256::from(31337));
        asserter.push_success(&Vec::<Address>::new());
        let toolchain = toolchain(asserter, None, None);

        let err = toolchain.deploy(&artifact()).await.unwrap_err();
        let DeploymentError::Submission(source) = err else {
            panic!("unexpected error {err:?}");
        };
        assert!(source.to_string().contains("no unlocked accounts"));
    }

    #[tokio::test]
    async fn successful_receipt_yields_address() {
        let toolchain = toolchain(Asserter::new(), None, None);

        let confirmed = toolchain
            .check_receipt(&pending(), &receipt(true, Some(Address::repeat_byte(0xc5))))
            .await
            .unwrap();
        assert_eq!(
            confirmed,
            ConfirmedDeployment {
                address: Address::repeat_byte(0xc5),
                tx_hash: B256::repeat_byte(7),
                block_number: Some(42),
            }
        );
    }

    #[tokio::test]
    async fn reverted_receipt_replays_for_reason() {
        let asserter = Asserter::new();
        asserter.push_failure(reverted_call("CryptexSphere: paused"));
        let toolchain = toolchain(asserter, None, None);

        let err = toolchain
            .check_receipt(&pending(), &receipt(false, None))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "transaction reverted: revert: CryptexSphere: paused"
        );
    }

    #[tokio::test]
    async fn reverted_receipt_that_replays_successfully() {
        let asserter = Asserter::new();
        asserter.push_success(&Bytes::new());
        let toolchain = toolchain(asserter, None, None);

        let err = toolchain
            .check_receipt(&pending(), &receipt(false, None))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("did not reproduce the revert"));
    }

    #[tokio::test]
    async fn receipt_without_contract_address() {
        let toolchain = toolchain(Asserter::new(), None, None);

        let err = toolchain
            .check_receipt(&pending(), &receipt(true, None))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not contain a contract address"));
    }

    #[tokio::test]
    async fn receipt_failure_is_a_confirmation_error() {
        let asserter = Asserter::new();
        asserter.push_failure_msg("header not found");
        let toolchain = toolchain(asserter, None, None);

        let err = toolchain.confirm(pending()).await.unwrap_err();
        assert!(matches!(
            err,
            DeploymentError::Confirmation { tx_hash, .. } if tx_hash == B256::repeat_byte(7)
        ));
    }
}
