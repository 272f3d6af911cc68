use std::collections::BTreeMap;
use std::time::Duration;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use super::{SecretHealth, SecretStore};
use crate::core::errors::{DistributeError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// KV v2 读响应：{ data: { data: { KEY: value } } }
#[derive(Debug, Deserialize)]
struct KvReadResponse {
    data: KvReadData,
}

#[derive(Debug, Deserialize)]
struct KvReadData {
    data: BTreeMap<String, String>,
}

/// 远端 vault 后端（KV v2）
///
/// 凭据放在 v1/secret/data/<scope> 下，一个 scope 一个版本化键值路径。
/// 路径不存在返回 None；连不上后端是另一种错误，不能和“没有密钥”混淆。
pub struct RemoteSecretStore {
    client: Client,
    addr: String,
    token: String,
    /// 写操作的管理员令牌，没有就拒绝写
    admin_token: Option<String>,
}

impl RemoteSecretStore {
    pub fn new(addr: impl Into<String>, token: impl Into<String>, admin_token: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        let mut addr = addr.into();
        while addr.ends_with('/') {
            addr.pop();
        }

        Self {
            client,
            addr,
            token: token.into(),
            admin_token,
        }
    }

    fn secret_url(&self, scope: &str) -> String {
        format!("{}/v1/secret/data/{}", self.addr, scope)
    }

    async fn read_scope(&self, scope: &str) -> Result<Option<BTreeMap<String, String>>> {
        let response = self
            .client
            .get(self.secret_url(scope))
            .header("X-Vault-Token", &self.token)
            .send()
            .await
            .map_err(|err| DistributeError::vault_unreachable(&self.addr, err.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: KvReadResponse = response
                    .json()
                    .await
                    .map_err(|err| DistributeError::server_error(status.as_u16(), err.to_string()))?;
                Ok(Some(body.data.data))
            }
            status => Err(DistributeError::server_error(
                status.as_u16(),
                format!("vault read failed for scope '{scope}'"),
            )),
        }
    }
}

#[async_trait]
impl SecretStore for RemoteSecretStore {
    async fn get(&self, scope: &str, key: &str) -> Result<Option<String>> {
        let Some(map) = self.read_scope(scope).await? else {
            return Ok(None);
        };
        Ok(map.get(key).cloned())
    }

    async fn set(&self, scope: &str, key: &str, value: &str) -> Result<()> {
        // 写操作有管理员门槛
        let Some(admin_token) = &self.admin_token else {
            return Err(DistributeError::Forbidden(
                "vault writes require an admin token".to_string(),
            ));
        };

        // 读-改-写，保住 scope 下其他键
        let mut map = self.read_scope(scope).await?.unwrap_or_default();
        map.insert(key.to_string(), value.to_string());

        let response = self
            .client
            .post(self.secret_url(scope))
            .header("X-Vault-Token", &self.token)
            .header("X-Vault-Admin-Token", admin_token)
            .json(&json!({ "data": map }))
            .send()
            .await
            .map_err(|err| DistributeError::vault_unreachable(&self.addr, err.to_string()))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(DistributeError::Forbidden(format!(
                "vault rejected write to scope '{scope}'"
            )));
        }
        if !status.is_success() {
            return Err(DistributeError::server_error(
                status.as_u16(),
                format!("vault write failed for scope '{scope}'"),
            ));
        }

        Ok(())
    }

    async fn health(&self) -> SecretHealth {
        let url = format!("{}/v1/sys/health", self.addr);
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => SecretHealth {
                backend: "vault",
                reachable: true,
                error: None,
            },
            Ok(response) => SecretHealth {
                backend: "vault",
                reachable: false,
                error: Some(format!("health returned {}", response.status())),
            },
            Err(err) => SecretHealth {
                backend: "vault",
                reachable: false,
                error: Some(err.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_backend_is_not_absent_secret() {
        // 没有任何服务监听的端口，连接立刻被拒
        let store = RemoteSecretStore::new("http://127.0.0.1:1", "token", None);

        let err = store.get("spotify_account_1", "CLIENT_ID").await.unwrap_err();
        assert!(matches!(err, DistributeError::VaultUnreachable { .. }));
    }

    #[tokio::test]
    async fn write_without_admin_token_is_forbidden() {
        let store = RemoteSecretStore::new("http://127.0.0.1:1", "token", None);

        let err = store.set("spotify_account_1", "CLIENT_ID", "abc").await.unwrap_err();
        // 管理员门槛在发请求之前就拦下来
        assert!(matches!(err, DistributeError::Forbidden(_)));
    }

    #[tokio::test]
    async fn health_reports_unreachable() {
        let store = RemoteSecretStore::new("http://127.0.0.1:1", "token", None);

        let health = store.health().await;
        assert_eq!(health.backend, "vault");
        assert!(!health.reachable);
        assert!(health.error.is_some());
    }

    #[test]
    fn addr_trailing_slash_is_normalized() {
        let store = RemoteSecretStore::new("http://127.0.0.1:8200/", "token", None);
        assert_eq!(
            store.secret_url("spotify_account_1"),
            "http://127.0.0.1:8200/v1/secret/data/spotify_account_1"
        );
    }
}
