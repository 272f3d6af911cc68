mod local;
mod remote;

pub use local::LocalSecretStore;
pub use remote::RemoteSecretStore;

use std::sync::Arc;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::config::SecretBackendConfig;
use crate::core::errors::Result;

/// 后端健康状况
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SecretHealth {
    pub backend: &'static str,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 凭据存储接口
///
/// 两种后端行为对调用方完全一致：`get` 查不到返回 `Ok(None)`，
/// 后端够不着才返回 `Err`，两者不混为一谈。
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// 读取 (scope, key) 下的凭据
    async fn get(&self, scope: &str, key: &str) -> Result<Option<String>>;

    /// 写入凭据，远端后端要求管理员令牌
    async fn set(&self, scope: &str, key: &str, value: &str) -> Result<()>;

    /// 后端健康状况
    async fn health(&self) -> SecretHealth;
}

/// 按配置打开对应的后端
pub fn open(config: &SecretBackendConfig) -> Arc<dyn SecretStore> {
    match config {
        SecretBackendConfig::Local { dir } => Arc::new(LocalSecretStore::new(dir.clone())),
        SecretBackendConfig::Vault {
            addr,
            token,
            admin_token,
        } => Arc::new(RemoteSecretStore::new(addr, token, admin_token.clone())),
    }
}
