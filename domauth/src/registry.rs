use crate::{
    backend::{file::FileBackend, krb5::Krb5Backend, SecurityDomainBackend},
    config::{BackendConfig, Config},
};
use anyhow::Result;
use arcstr::ArcStr;
use fxhash::FxHashMap;
use std::{collections::HashMap, sync::Arc};

/// A named, independently configured identity backend.
pub struct Domain {
    name: ArcStr,
    backend: Arc<dyn SecurityDomainBackend>,
}

impl Domain {
    pub fn new(name: ArcStr, backend: Arc<dyn SecurityDomainBackend>) -> Self {
        Domain { name, backend }
    }

    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    pub fn backend(&self) -> &Arc<dyn SecurityDomainBackend> {
        &self.backend
    }
}

/// The configured security domains, in the order unqualified logons try
/// them. Resolution is a pure lookup; a missing or empty name is a
/// normal miss, not an error.
pub struct DomainRegistry {
    domains: Vec<Arc<Domain>>,
    by_name: FxHashMap<ArcStr, Arc<Domain>>,
}

impl DomainRegistry {
    pub fn new(domains: Vec<Arc<Domain>>) -> Result<Self> {
        let mut by_name: FxHashMap<ArcStr, Arc<Domain>> = HashMap::default();
        for d in &domains {
            if by_name.insert(d.name.clone(), d.clone()).is_some() {
                bail!("duplicate security domain {}", d.name)
            }
        }
        Ok(DomainRegistry { domains, by_name })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let mut domains = Vec::with_capacity(cfg.domains.len());
        for d in &cfg.domains {
            let backend: Arc<dyn SecurityDomainBackend> = match &d.backend {
                BackendConfig::File { path } => Arc::new(FileBackend::load(&**path)?),
                BackendConfig::Krb5 { spn } => Arc::new(Krb5Backend::new(spn.clone())),
            };
            domains.push(Arc::new(Domain::new(d.name.clone(), backend)));
        }
        Self::new(domains)
    }

    pub fn resolve(&self, name: &str) -> Option<&Arc<Domain>> {
        if name.is_empty() {
            return None;
        }
        self.by_name.get(name)
    }

    pub fn domains(&self) -> &[Arc<Domain>] {
        &self.domains
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::backend::file::FileBackend;

    fn domain(name: &str) -> Arc<Domain> {
        Arc::new(Domain::new(ArcStr::from(name), Arc::new(FileBackend::from_entries([]))))
    }

    #[test]
    fn resolve_is_a_pure_lookup() {
        let reg = DomainRegistry::new(vec![domain("corp"), domain("eng")]).unwrap();
        assert!(reg.resolve("corp").is_some());
        assert!(reg.resolve("eng").is_some());
        assert!(reg.resolve("nowhere").is_none());
        assert!(reg.resolve("").is_none());
        let order = reg.domains().iter().map(|d| d.name().to_string()).collect::<Vec<_>>();
        assert_eq!(order, vec!["corp", "eng"]);
    }

    #[test]
    fn duplicate_domains_are_rejected() {
        assert!(DomainRegistry::new(vec![domain("corp"), domain("corp")]).is_err());
    }
}
