//! Service configuration
//!
//! See the file module for documentation of the on disk format.

use anyhow::Result;
use arcstr::ArcStr;
use std::{fs::read_to_string, path::Path};

/// The backend family serving a security domain.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// A JSON user store with salted sha3-512 password hashes, loaded
    /// from the given path.
    File { path: ArcStr },
    /// A kerberos acceptor for the given service principal name.
    Krb5 { spn: ArcStr },
}

#[derive(Debug, Clone)]
pub struct DomainConfig {
    pub name: ArcStr,
    pub backend: BackendConfig,
}

/// Service configuration. Domain order is the order unqualified user
/// names are tried in.
#[derive(Debug, Clone)]
pub struct Config {
    pub domains: Vec<DomainConfig>,
}

impl Config {
    pub fn parse(s: &str) -> Result<Config> {
        let cfg: file::Config = serde_json::from_str(s)?;
        Config::from_file(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        Config::parse(&read_to_string(path)?)
    }

    fn from_file(cfg: file::Config) -> Result<Config> {
        if cfg.domains.is_empty() {
            bail!("at least one security domain is required")
        }
        let domains = cfg
            .domains
            .into_iter()
            .map(|d| {
                if d.name.is_empty() {
                    bail!("the security domain name may not be empty")
                }
                let backend = match d.backend {
                    file::Backend::File(path) => BackendConfig::File { path },
                    file::Backend::Krb5(spn) => {
                        if spn.is_empty() {
                            bail!("spn is required in krb5 mode")
                        }
                        BackendConfig::Krb5 { spn }
                    }
                };
                Ok(DomainConfig { name: d.name, backend })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Config { domains })
    }
}

/// The on disk format, encoded as JSON
pub mod file {
    use arcstr::ArcStr;

    /// The backend family of a security domain
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub enum Backend {
        File(ArcStr),
        Krb5(ArcStr),
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct Domain {
        pub name: ArcStr,
        pub backend: Backend,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct Config {
        pub domains: Vec<Domain>,
    }
}
