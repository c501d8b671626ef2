use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::application::dto::ConfigFile;
use crate::application::ports::ConfigStorePort;
use crate::domain::errors::DomainResult;

/// Configuration persisted as a pretty-printed JSON file.
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigStorePort for JsonConfigStore {
    fn load(&self) -> DomainResult<Option<ConfigFile>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file = serde_json::from_str(&text)?;
        tracing::info!("Loaded configuration from {}", self.path.display());
        Ok(Some(file))
    }

    fn save(&self, file: &ConfigFile) -> DomainResult<()> {
        fs::write(&self.path, file.to_json()?)?;
        tracing::info!("Configuration saved to {}", self.path.display());
        Ok(())
    }
}
