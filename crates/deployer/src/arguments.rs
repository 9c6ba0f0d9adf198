use {
    crate::config::{DEFAULT_CONFIG_FILE, Overrides},
    clap::Parser,
    std::{
        fmt::{self, Display, Formatter},
        num::NonZeroU64,
        path::PathBuf,
    },
    url::Url,
};

/// Deploys a compiled contract and prints the address of the new instance.
#[derive(Parser)]
#[clap(name = "deploy", version)]
pub struct Arguments {
    /// Contract to deploy, either by name or by fully qualified name
    /// (`contracts/CryptexSphere.sol:CryptexSphere`).
    #[clap(long, env = "DEPLOY_CONTRACT", default_value = "CryptexSphere")]
    pub contract: String,

    /// Directory containing the compiled Hardhat artifacts.
    #[clap(long, env = "DEPLOY_ARTIFACTS", default_value = "artifacts")]
    pub artifacts: PathBuf,

    /// Network configuration file. Defaults to `deploy.toml` in the working
    /// directory if it exists.
    #[clap(long, env = "DEPLOY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Network to deploy to. Defaults to the configured `default-network`,
    /// then to `localhost`.
    #[clap(long, env = "DEPLOY_NETWORK")]
    pub network: Option<String>,

    /// The Ethereum node URL to connect to. Overrides the URL of the selected
    /// network.
    #[clap(long, env)]
    pub node_url: Option<Url>,

    /// Hex encoded private key signing the deployment. Overrides the key of
    /// the selected network.
    #[clap(long, env, hide_env_values = true)]
    pub private_key: Option<String>,

    /// Number of confirmations to wait for. Overrides the value of the
    /// selected network.
    #[clap(long, env)]
    pub confirmations: Option<NonZeroU64>,

    /// Log filter directives, see
    /// https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
    #[clap(long, env, default_value = "warn,deploy=info,deployer=info")]
    pub log_filter: String,

    /// Emit logs as JSON.
    #[clap(long, env)]
    pub log_json: bool,
}

impl Arguments {
    /// The configuration file to read and whether it was chosen explicitly.
    pub fn config_file(&self) -> (PathBuf, bool) {
        match &self.config {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        }
    }

    pub fn overrides(&self) -> Overrides {
        Overrides {
            network: self.network.clone(),
            node_url: self.node_url.clone(),
            private_key: self.private_key.clone(),
            confirmations: self.confirmations,
        }
    }
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            contract,
            artifacts,
            config,
            network,
            node_url,
            private_key,
            confirmations,
            log_filter,
            log_json,
        } = self;

        writeln!(f, "contract: {contract}")?;
        writeln!(f, "artifacts: {}", artifacts.display())?;
        display_option(f, "config", &config.as_ref().map(|path| path.display()))?;
        display_option(f, "network", network)?;
        display_option(f, "node_url", node_url)?;
        display_secret_option(f, "private_key", private_key)?;
        display_option(f, "confirmations", confirmations)?;
        writeln!(f, "log_filter: {log_filter}")?;
        writeln!(f, "log_json: {log_json}")?;
        Ok(())
    }
}

fn display_secret_option<T>(
    f: &mut Formatter<'_>,
    name: &str,
    option: &Option<T>,
) -> fmt::Result {
    display_option(f, name, &option.as_ref().map(|_| "SECRET"))
}

fn display_option(
    f: &mut Formatter<'_>,
    name: &str,
    option: &Option<impl Display>,
) -> fmt::Result {
    write!(f, "{name}: ")?;
    match option {
        Some(display) => writeln!(f, "{display}"),
        None => writeln!(f, "None"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_arguments() {
        let args = Arguments::try_parse_from(["deploy"]).unwrap();
        assert_eq!(args.contract, "CryptexSphere");
        assert_eq!(args.artifacts, PathBuf::from("artifacts"));
        assert_eq!(args.config_file(), (PathBuf::from("deploy.toml"), false));
    }

    #[test]
    fn explicit_config_file() {
        let args = Arguments::try_parse_from(["deploy", "--config", "networks.toml"]).unwrap();
        assert_eq!(args.config_file(), (PathBuf::from("networks.toml"), true));
    }

    #[test]
    fn rejects_zero_confirmations() {
        assert!(Arguments::try_parse_from(["deploy", "--confirmations", "0"]).is_err());
    }

    #[test]
    fn display_hides_private_key() {
        let args = Arguments::try_parse_from([
            "deploy",
            "--network",
            "sepolia",
            "--private-key",
            "0x0123456789abcdef",
        ])
        .unwrap();
        let displayed = args.to_string();
        assert!(displayed.contains("network: sepolia"));
        assert!(displayed.contains("private_key: SECRET"));
        assert!(!displayed.contains("0123456789abcdef"));
    }
}
