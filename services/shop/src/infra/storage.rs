use std::path::PathBuf;

use anyhow::Context as _;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::domain::repository::FileStorage;
use crate::error::ShopError;

/// Writes uploads under a local directory that the router serves statically.
#[derive(Clone)]
pub struct LocalFileStorage {
    pub upload_dir: PathBuf,
    pub public_path: String,
}

impl LocalFileStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            upload_dir: PathBuf::from(&config.upload_dir),
            public_path: config.public_path.clone(),
        }
    }
}

impl FileStorage for LocalFileStorage {
    async fn store(
        &self,
        folder: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, ShopError> {
        let dir = self.upload_dir.join(folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("create upload dir {}", dir.display()))?;
        let name = format!("{}.{extension}", Uuid::new_v4());
        tokio::fs::write(dir.join(&name), bytes)
            .await
            .with_context(|| format!("write upload {name}"))?;
        Ok(format!("{}/{folder}/{name}", self.public_path))
    }
}
