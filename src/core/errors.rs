use thiserror::Error;

#[derive(Error, Debug)]
pub enum DistributeError {
    #[error("HTTP Request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Server error: status code {status_code}, message: {message}")]
    ServerError {
        status_code: u16,
        message: String,
    },

    /// 远端凭据后端连不上，与“密钥不存在”是两种不同情况
    #[error("Vault unreachable at {addr}: {message}")]
    VaultUnreachable {
        addr: String,
        message: String,
    },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 浏览器自动化失败（会话建立、表单提交）
    #[error("Driver error: {0}")]
    DriverError(String),

    #[error("Timed out waiting for '{selector}' after {waited_secs}s")]
    SelectorTimeout {
        selector: String,
        waited_secs: u64,
    },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Param error: {0}")]
    ParamError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DistributeError {
    pub fn server_error(status_code: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status_code,
            message: message.into(),
        }
    }

    pub fn vault_unreachable(addr: impl Into<String>, message: impl Into<String>) -> Self {
        Self::VaultUnreachable {
            addr: addr.into(),
            message: message.into(),
        }
    }

    pub fn driver(message: impl Into<String>) -> Self {
        Self::DriverError(message.into())
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

/// Error alias
pub type Result<T, E = DistributeError> = std::result::Result<T, E>;
