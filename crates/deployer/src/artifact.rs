//! Lookup of compiled contracts in a Hardhat `artifacts/` directory.
//!
//! Hardhat writes one JSON file per contract at
//! `<root>/<source path>/<Contract>.json` next to a `<Contract>.dbg.json`
//! pointing at the build info. Only the former is read.

use {
    crate::toolchain::ContractArtifact,
    alloy::{
        json_abi::JsonAbi,
        primitives::{Bytes, hex},
    },
    anyhow::{Context, Result, anyhow, bail, ensure},
    serde::Deserialize,
    std::{
        fs,
        path::{Path, PathBuf},
    },
    walkdir::{DirEntry, WalkDir},
};

const BUILD_INFO_DIR: &str = "build-info";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatArtifact {
    contract_name: String,
    source_name: String,
    abi: JsonAbi,
    bytecode: String,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves either a bare contract name (`CryptexSphere`) or a fully
    /// qualified one (`contracts/CryptexSphere.sol:CryptexSphere`).
    ///
    /// Blocks on file system access.
    pub fn find(&self, name: &str) -> Result<ContractArtifact> {
        ensure!(
            self.root.is_dir(),
            "artifacts directory {:?} does not exist, are the contracts compiled?",
            self.root
        );

        let (path, contract) = match name.rsplit_once(':') {
            Some((source, contract)) => {
                let path = self.root.join(source).join(format!("{contract}.json"));
                ensure!(path.is_file(), "no artifact at {path:?}");
                (path, contract)
            }
            None => (self.find_unqualified(name)?, name),
        };

        let artifact = load(&path).with_context(|| format!("invalid artifact {path:?}"))?;
        ensure!(
            artifact.contract_name == contract,
            "artifact {path:?} describes contract {:?}",
            artifact.contract_name
        );
        Ok(artifact)
    }

    fn find_unqualified(&self, name: &str) -> Result<PathBuf> {
        let file_name = format!("{name}.json");
        let mut candidates = Vec::new();
        for entry in WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_build_info(entry))
        {
            let entry = entry
                .with_context(|| format!("failed to scan artifacts directory {:?}", self.root))?;
            if entry.file_type().is_file() && entry.file_name() == file_name.as_str() {
                candidates.push(entry.into_path());
            }
        }

        match candidates.len() {
            0 => Err(anyhow!(
                "no compiled artifact named {name:?} in {:?}",
                self.root
            )),
            1 => Ok(candidates.remove(0)),
            _ => {
                let names = candidates
                    .iter()
                    .map(|path| self.qualified_name(path, name))
                    .collect::<Vec<_>>()
                    .join(", ");
                bail!("multiple artifacts named {name:?}, use one of: {names}")
            }
        }
    }

    fn qualified_name(&self, path: &Path, contract: &str) -> String {
        let source = path
            .parent()
            .and_then(|parent| parent.strip_prefix(&self.root).ok())
            .map(|source| {
                source
                    .components()
                    .map(|component| component.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default();
        format!("{source}:{contract}")
    }
}

fn is_build_info(entry: &DirEntry) -> bool {
    entry.depth() == 1 && entry.file_type().is_dir() && entry.file_name() == BUILD_INFO_DIR
}

fn load(path: &Path) -> Result<ContractArtifact> {
    let data = fs::read_to_string(path)?;
    let artifact: HardhatArtifact = serde_json::from_str(&data)?;
    Ok(ContractArtifact {
        bytecode: creation_code(&artifact.bytecode)?,
        contract_name: artifact.contract_name,
        source_name: artifact.source_name,
        abi: artifact.abi,
    })
}

fn creation_code(bytecode: &str) -> Result<Bytes> {
    let code = bytecode.strip_prefix("0x").unwrap_or(bytecode);
    // Hardhat leaves `__$<hash>$__` placeholders where libraries get linked.
    ensure!(
        !code.contains("__"),
        "bytecode contains unlinked library references"
    );
    let code = hex::decode(code).context("bytecode is not valid hex")?;
    ensure!(
        !code.is_empty(),
        "contract has no bytecode, it is abstract or an interface"
    );
    Ok(code.into())
}
