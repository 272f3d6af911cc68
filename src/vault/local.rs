use std::collections::BTreeMap;
use std::path::PathBuf;
use async_trait::async_trait;
use super::{SecretHealth, SecretStore};
use crate::core::errors::Result;

/// 本地文件后端：每个 scope 一个 JSON 对象文件
///
/// 写入是读-改-写，同 scope 下不相关的键保持原样。
/// 写操作由运维触发、频率极低，这里不加锁，后写覆盖先写。
#[derive(Debug, Clone)]
pub struct LocalSecretStore {
    dir: PathBuf,
}

impl LocalSecretStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn scope_path(&self, scope: &str) -> PathBuf {
        self.dir.join(format!("{scope}.json"))
    }

    async fn read_scope(&self, scope: &str) -> Result<Option<BTreeMap<String, String>>> {
        let path = self.scope_path(scope);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Ok(Some(serde_json::from_str(&content)?))
    }
}

#[async_trait]
impl SecretStore for LocalSecretStore {
    async fn get(&self, scope: &str, key: &str) -> Result<Option<String>> {
        let Some(map) = self.read_scope(scope).await? else {
            return Ok(None);
        };
        Ok(map.get(key).cloned())
    }

    async fn set(&self, scope: &str, key: &str, value: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut map = self.read_scope(scope).await?.unwrap_or_default();
        map.insert(key.to_string(), value.to_string());

        let data = serde_json::to_string_pretty(&map)?;
        tokio::fs::write(self.scope_path(scope), data).await?;

        Ok(())
    }

    async fn health(&self) -> SecretHealth {
        match tokio::fs::create_dir_all(&self.dir).await {
            Ok(()) => SecretHealth {
                backend: "local",
                reachable: true,
                error: None,
            },
            Err(err) => SecretHealth {
                backend: "local",
                reachable: false,
                error: Some(err.to_string()),
            },
        }
    }
}
