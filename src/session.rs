use std::path::PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::core::errors::Result;

/// 会话描述符：一次成功登录后序列化下来的 cookie/storage 状态，
/// 足以在下次分发时跳过交互式登录。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionDescriptor {
    pub platform: String,
    pub account_id: u32,
    /// 浏览器导出的存储状态，原样保存
    pub storage_state: serde_json::Value,
    pub saved_at: DateTime<Utc>,
}

impl SessionDescriptor {
    pub fn new(platform: impl Into<String>, account_id: u32, storage_state: serde_json::Value) -> Self {
        Self {
            platform: platform.into(),
            account_id,
            storage_state,
            saved_at: Utc::now(),
        }
    }
}

/// 会话存储，按 (platform, account) 一个 JSON 文件
///
/// 写入先落临时文件再 rename，描述符要么整体替换要么不动，
/// 不存在写一半的状态。
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, platform: &str, account_id: u32) -> PathBuf {
        self.dir.join(format!("session_{platform}_{account_id}.json"))
    }

    /// 分发前读取，决定是否需要登录
    pub async fn load(&self, platform: &str, account_id: u32) -> Result<Option<SessionDescriptor>> {
        let path = self.path(platform, account_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Ok(Some(serde_json::from_str(&content)?))
    }

    /// 原子替换
    pub async fn save(&self, descriptor: &SessionDescriptor) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path(&descriptor.platform, descriptor.account_id);
        let tmp = path.with_extension("json.tmp");

        let data = serde_json::to_string_pretty(descriptor)?;
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &path).await?;

        Ok(())
    }

    pub async fn clear(&self, platform: &str, account_id: u32) -> Result<()> {
        let path = self.path(platform, account_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
