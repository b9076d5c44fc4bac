//! Process-wide, read-only registry of contract metadata keyed by contract name.
//!
//! The registry is assembled once at startup through [`RegistryBuilder`] and frozen with
//! [`RegistryBuilder::install`]. After that it can only be read.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tokio::fs;
use tracing::{debug, info, warn};

use super::ContractMetadata;
use crate::error::{BindError, Result};

static GLOBAL: OnceLock<Registry> = OnceLock::new();

#[derive(Debug, Default)]
pub struct Registry {
    contracts: BTreeMap<String, Arc<ContractMetadata>>,
}

impl Registry {
    pub fn get(&self, name: &str) -> Option<&Arc<ContractMetadata>> {
        self.contracts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.contracts.contains_key(name)
    }

    /// Contract names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contracts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    contracts: BTreeMap<String, Arc<ContractMetadata>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a contract. Names must be unique.
    pub fn insert(&mut self, name: impl Into<String>, metadata: ContractMetadata) -> Result<&mut Self> {
        let name = name.into();
        if self.contracts.contains_key(&name) {
            return Err(BindError::Registry(format!("contract `{name}` registered twice")));
        }
        debug!("Registered contract metadata for {}", name);
        self.contracts.insert(name, Arc::new(metadata));
        Ok(self)
    }

    /// Load every `<Name>.abi` / `<Name>.json` file in `dir`, pairing it with `<Name>.bin`
    /// when present. `.json` files may be bare ABIs or compiler artifacts.
    pub async fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        let mut entries = fs::read_dir(dir).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            paths.push(entry.path());
        }
        // read_dir order is platform dependent
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            let ext = path.extension().and_then(|e| e.to_str());
            if !matches!(ext, Some("abi") | Some("json")) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                warn!("Skipping ABI file with non UTF-8 name: {:?}", path);
                continue;
            };

            let content = fs::read_to_string(&path).await?;
            let metadata = if content.trim_start().starts_with('{') {
                ContractMetadata::from_artifact(&content)?
            } else {
                let bin_path = path.with_extension("bin");
                let bin = match fs::read_to_string(&bin_path).await {
                    Ok(bin) => Some(bin.trim().to_string()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                    Err(e) => return Err(e.into()),
                };
                ContractMetadata::new(content, bin)
            };

            self.insert(name, metadata)?;
            loaded += 1;
        }

        info!("Loaded {} contract ABIs from {:?}", loaded, dir);
        Ok(loaded)
    }

    pub fn build(self) -> Registry {
        Registry {
            contracts: self.contracts,
        }
    }

    /// Freeze the registry into the process-wide slot. Fails if one was installed already.
    pub fn install(self) -> Result<&'static Registry> {
        let registry = self.build();
        let count = registry.len();
        GLOBAL
            .set(registry)
            .map_err(|_| BindError::Registry("global registry already installed".to_string()))?;
        info!("Installed contract registry with {} contracts", count);
        Ok(global().unwrap_or_else(|| unreachable!("registry was just installed")))
    }
}

/// The installed registry, if any.
pub fn global() -> Option<&'static Registry> {
    GLOBAL.get()
}

/// Look a contract up in the installed registry.
pub fn lookup(name: &str) -> Result<Arc<ContractMetadata>> {
    global()
        .and_then(|r| r.get(name))
        .cloned()
        .ok_or_else(|| BindError::Registry(format!("contract `{name}` is not registered")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const ABI: &str = r#"[{"type":"function","name":"ping","inputs":[],"outputs":[],"stateMutability":"view"}]"#;

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut builder = RegistryBuilder::new();
        builder.insert("Ping", ContractMetadata::new(ABI, None)).unwrap();
        assert!(builder.insert("Ping", ContractMetadata::new(ABI, None)).is_err());
    }

    #[tokio::test]
    async fn test_load_dir_pairs_abi_and_bin() {
        let temp_dir = tempdir().unwrap();
        fs::write(temp_dir.path().join("Ping.abi"), ABI).await.unwrap();
        fs::write(temp_dir.path().join("Ping.bin"), "0x6001\n").await.unwrap();
        fs::write(temp_dir.path().join("Pong.abi"), ABI).await.unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "ignored").await.unwrap();

        let mut builder = RegistryBuilder::new();
        let loaded = builder.load_dir(temp_dir.path()).await.unwrap();
        assert_eq!(loaded, 2);

        let registry = builder.build();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Ping", "Pong"]);
        assert_eq!(registry.get("Ping").unwrap().bin(), Some("0x6001"));
        assert_eq!(registry.get("Pong").unwrap().bin(), None);
    }

    #[test]
    fn test_install_once() {
        let mut builder = RegistryBuilder::new();
        builder.insert("Ping", ContractMetadata::new(ABI, None)).unwrap();
        // other tests in this process may have installed first
        if builder.install().is_ok() {
            assert!(lookup("Ping").is_ok());
            assert!(RegistryBuilder::new().install().is_err());
        } else {
            assert!(global().is_some());
        }
        assert!(lookup("Missing").is_err());
    }
}
