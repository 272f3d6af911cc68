use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::core::errors::{DistributeError, Result};

/// 运行模式：demo 走模拟路径，live 才会真正驱动浏览器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    #[default]
    Demo,
    Live,
}

/// 单个平台的开关
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PlatformToggle {
    pub enabled: bool,
}

/// 凭据后端选择，进程级一次性决定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum SecretBackendConfig {
    /// 本地 JSON 文件，每个 scope 一个文件
    Local {
        dir: PathBuf,
    },
    /// 远端 vault（KV v2），写入需要管理员令牌
    Vault {
        addr: String,
        token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        admin_token: Option<String>,
    },
}

impl Default for SecretBackendConfig {
    fn default() -> Self {
        Self::Local {
            dir: PathBuf::from("credentials"),
        }
    }
}

/// 浏览器驱动（WebDriver 端点）配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebDriverConfig {
    pub endpoint: String,
    pub headless: bool,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9515".to_string(),
            headless: true,
        }
    }
}

/// 各阶段的等待预算（秒）
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct TimeoutConfig {
    /// 等待登录完成标志
    pub login_secs: u64,
    /// 等待上传完成标志
    pub completion_secs: u64,
    /// 等待普通元素出现
    pub selector_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            login_secs: 15,
            completion_secs: 20,
            selector_secs: 10,
        }
    }
}

impl TimeoutConfig {
    pub fn login(&self) -> Duration {
        Duration::from_secs(self.login_secs)
    }

    pub fn completion(&self) -> Duration {
        Duration::from_secs(self.completion_secs)
    }

    pub fn selector(&self) -> Duration {
        Duration::from_secs(self.selector_secs)
    }
}

/// 分发配置
///
/// 显式传入各组件，不放进程级全局量，测试可以注入互不相同的配置。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DistributionConfig {
    #[serde(default)]
    pub mode: OperatingMode,
    /// 平台开关表，缺席的平台视为关闭
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformToggle>,
    #[serde(default = "default_sessions_dir")]
    pub sessions_dir: PathBuf,
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
    #[serde(default)]
    pub secrets: SecretBackendConfig,
    /// 告警 webhook，缺席时告警是空操作
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_webhook: Option<String>,
    /// 聚合器推送端点，demo 分发后向它发一条不阻塞的通知
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregator_push_url: Option<String>,
    #[serde(default)]
    pub webdriver: WebDriverConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

fn default_sessions_dir() -> PathBuf {
    PathBuf::from("sessions")
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for DistributionConfig {
    fn default() -> Self {
        let mut platforms = BTreeMap::new();
        for name in ["spotify", "soundcloud", "audiomack", "apple"] {
            platforms.insert(name.to_string(), PlatformToggle { enabled: true });
        }

        Self {
            mode: OperatingMode::Demo,
            platforms,
            sessions_dir: default_sessions_dir(),
            logs_dir: default_logs_dir(),
            secrets: SecretBackendConfig::default(),
            alert_webhook: None,
            aggregator_push_url: None,
            webdriver: WebDriverConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl DistributionConfig {
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|err| DistributeError::ConfigError(err.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            DistributeError::ConfigError(format!("can't read {}: {}", path.display(), err))
        })?;
        Self::from_str(&content)
    }

    /// 开关表里没有的平台一律视为关闭
    pub fn platform_enabled(&self, name: &str) -> bool {
        self.platforms.get(name).map(|t| t.enabled).unwrap_or(false)
    }

    pub fn is_demo(&self) -> bool {
        self.mode == OperatingMode::Demo
    }

    /// 配置好的平台名列表（含关闭的），聚合器按这个列表读日志
    pub fn platform_names(&self) -> Vec<String> {
        self.platforms.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config = DistributionConfig::from_str(
            r#"
            mode = "live"
            sessions_dir = "/var/lib/syndicate/sessions"
            logs_dir = "/var/log/syndicate"
            alert_webhook = "https://hooks.example.com/alerts"

            [platforms.spotify]
            enabled = true
            [platforms.audiomack]
            enabled = false

            [secrets]
            backend = "vault"
            addr = "http://127.0.0.1:8200"
            token = "root-token"
            admin_token = "admin-token"

            [webdriver]
            endpoint = "http://127.0.0.1:9515"
            headless = true

            [timeouts]
            login_secs = 5
            completion_secs = 8
            selector_secs = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, OperatingMode::Live);
        assert!(config.platform_enabled("spotify"));
        assert!(!config.platform_enabled("audiomack"));
        // 表里没有的平台视为关闭
        assert!(!config.platform_enabled("apple"));
        assert!(matches!(config.secrets, SecretBackendConfig::Vault { .. }));
        assert_eq!(config.timeouts.login(), Duration::from_secs(5));
    }

    #[test]
    fn default_is_demo_with_all_platforms() {
        let config = DistributionConfig::default();
        assert!(config.is_demo());
        for name in ["spotify", "soundcloud", "audiomack", "apple"] {
            assert!(config.platform_enabled(name));
        }
    }
}
