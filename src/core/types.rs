use std::collections::HashMap;
use std::path::PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 单次分发的唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct DispatchId(pub Uuid);

impl DispatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DispatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DispatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 分发结果状态枚举，固定词汇表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// 平台在配置中被关闭
    DisabledInConfig,
    /// demo 模式下的模拟成功
    DemoSimulated,
    /// 凭据缺失（浏览器登录类平台）
    MissingCredentials,
    /// 凭据缺失（API 凭据类平台，等待授权）
    PendingAuth,
    /// 源文件不可访问
    FileNotFound,
    /// 上传成功
    Success,
    /// 会话建立或表单提交过程中出现异常
    Error,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::DisabledInConfig => "disabled_in_config",
            OutcomeStatus::DemoSimulated => "demo_simulated",
            OutcomeStatus::MissingCredentials => "missing_credentials",
            OutcomeStatus::PendingAuth => "pending_auth",
            OutcomeStatus::FileNotFound => "file_not_found",
            OutcomeStatus::Success => "success",
            OutcomeStatus::Error => "error",
        }
    }

    /// 只有 error 触发告警，配置缺失类状态不算异常
    pub fn should_alert(&self) -> bool {
        matches!(self, OutcomeStatus::Error)
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 素材元数据，各字段相互独立，缺失的字段不会被填入表单
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TrackMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

impl TrackMetadata {
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }
}

/// 上传请求，只在一次分发期间存在，本身不落盘
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadRequest {
    pub asset_id: String,
    pub file_path: PathBuf,
    #[serde(default)]
    pub metadata: TrackMetadata,
    pub account_id: u32,
}

impl UploadRequest {
    pub fn new(asset_id: impl Into<String>, file_path: impl Into<PathBuf>, account_id: u32) -> Self {
        Self {
            asset_id: asset_id.into(),
            file_path: file_path.into(),
            metadata: TrackMetadata::default(),
            account_id,
        }
    }

    pub fn with_metadata(mut self, metadata: TrackMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// 分发结果，审计日志里一次尝试对应一条记录
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadOutcome {
    pub dispatch_id: DispatchId,
    pub platform: String,
    pub asset_id: String,
    pub account_id: u32,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl UploadOutcome {
    pub fn new(platform: &str, request: &UploadRequest, status: OutcomeStatus) -> Self {
        Self {
            dispatch_id: DispatchId::new(),
            platform: platform.to_string(),
            asset_id: request.asset_id.clone(),
            account_id: request.account_id,
            status,
            track_id: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_track_id(mut self, track_id: impl Into<String>) -> Self {
        self.track_id = Some(track_id.into());
        self
    }

    /// 错误信息原样保留
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

/// 外部观察到的总体结论，由调用方推送给聚合器
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExternalSummary {
    pub status: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

impl ExternalSummary {
    pub fn new(status: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            details: details.into(),
            timestamp: Utc::now(),
        }
    }
}

/// 次级持久化计数，仅供参考，拿不到不算失败
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PersistenceCounts {
    pub counts: HashMap<String, u64>,
}

// 静态断言确保类型是 Send 的
const _: () = {
    fn assert_send<T: Send>() {}
    fn assert_types() {
        assert_send::<UploadRequest>();
        assert_send::<UploadOutcome>();
        assert_send::<ExternalSummary>();
    }
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_status_serializes_snake_case() {
        let json = serde_json::to_string(&OutcomeStatus::DisabledInConfig).unwrap();
        assert_eq!(json, "\"disabled_in_config\"");
        let json = serde_json::to_string(&OutcomeStatus::DemoSimulated).unwrap();
        assert_eq!(json, "\"demo_simulated\"");

        let parsed: OutcomeStatus = serde_json::from_str("\"pending_auth\"").unwrap();
        assert_eq!(parsed, OutcomeStatus::PendingAuth);
    }

    #[test]
    fn outcome_record_skips_absent_fields() {
        let request = UploadRequest::new("asset-1", "/tmp/a.mp3", 1);
        let outcome = UploadOutcome::new("spotify", &request, OutcomeStatus::Success);
        let value = serde_json::to_value(&outcome).unwrap();

        assert_eq!(value["platform"], "spotify");
        assert_eq!(value["status"], "success");
        assert!(value.get("error").is_none());
        assert!(value.get("track_id").is_none());
    }

    #[test]
    fn only_error_alerts() {
        assert!(OutcomeStatus::Error.should_alert());
        assert!(!OutcomeStatus::FileNotFound.should_alert());
        assert!(!OutcomeStatus::MissingCredentials.should_alert());
    }
}
