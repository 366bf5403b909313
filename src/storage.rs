use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;

/// Durable storage for uploaded meal images. Writes here are independent of
/// the database transaction that references them: a DB failure after a write
/// leaves the file behind.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, filename: &str, body: Bytes) -> anyhow::Result<()>;
}

/// Local-disk storage rooted at the upload directory, which is also served
/// statically under `/uploads`.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub async fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("criar diretório de uploads {}", root.display()))?;
        Ok(Self { root })
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(&self, filename: &str, body: Bytes) -> anyhow::Result<()> {
        let path = self.root.join(filename);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("gravar imagem em {}", path.display()))?;
        Ok(())
    }
}
