use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use crate::core::errors::Result;
use crate::core::types::UploadOutcome;

/// 审计日志读出来的“当前状态”
///
/// 空文件、坏行、文件不存在都是一等状态值，不是读取失败。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastStatus {
    Status(String),
    Empty,
    ParseError,
    NoLogs,
}

impl LastStatus {
    pub fn as_str(&self) -> &str {
        match self {
            LastStatus::Status(s) => s.as_str(),
            LastStatus::Empty => "empty",
            LastStatus::ParseError => "parse_error",
            LastStatus::NoLogs => "no_logs",
        }
    }
}

impl std::fmt::Display for LastStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 审计日志，按平台一个文件，一行一个 JSON 对象，只追加
#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn log_path(&self, platform: &str) -> PathBuf {
        self.dir.join(format!("{platform}.log"))
    }

    /// 追加一条分发记录，从不改写已有行
    pub async fn append(&self, platform: &str, outcome: &UploadOutcome) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut line = serde_json::to_string(outcome)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(platform))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    /// 最后一行即当前状态
    pub async fn last_status(&self, platform: &str) -> LastStatus {
        read_last_status(&self.log_path(platform)).await
    }
}

async fn read_last_status(path: &Path) -> LastStatus {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return LastStatus::NoLogs,
        Err(_) => return LastStatus::NoLogs,
    };

    let last_line = match content.lines().filter(|l| !l.trim().is_empty()).last() {
        Some(line) => line,
        None => return LastStatus::Empty,
    };

    match serde_json::from_str::<serde_json::Value>(last_line) {
        Ok(value) => {
            let status = value
                .get("status")
                .and_then(|s| s.as_str())
                .unwrap_or("unknown");
            LastStatus::Status(status.to_string())
        }
        Err(_) => LastStatus::ParseError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{OutcomeStatus, UploadRequest};

    fn outcome(status: OutcomeStatus) -> UploadOutcome {
        let request = UploadRequest::new("asset-1", "/tmp/a.mp3", 1);
        UploadOutcome::new("spotify", &request, status)
    }

    #[tokio::test]
    async fn missing_file_reads_no_logs() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::new(dir.path());
        assert_eq!(audit.last_status("spotify").await, LastStatus::NoLogs);
    }

    #[tokio::test]
    async fn empty_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::new(dir.path());
        tokio::fs::write(audit.log_path("spotify"), "").await.unwrap();
        assert_eq!(audit.last_status("spotify").await, LastStatus::Empty);
    }

    #[tokio::test]
    async fn malformed_last_line_reads_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::new(dir.path());
        tokio::fs::write(audit.log_path("spotify"), "{not json\n")
            .await
            .unwrap();
        assert_eq!(audit.last_status("spotify").await, LastStatus::ParseError);
    }

    #[tokio::test]
    async fn last_line_status_wins() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::new(dir.path());
        tokio::fs::write(audit.log_path("spotify"), "{\"status\":\"ok\"}\n")
            .await
            .unwrap();
        assert_eq!(
            audit.last_status("spotify").await,
            LastStatus::Status("ok".to_string())
        );
    }

    #[tokio::test]
    async fn append_is_append_only() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::new(dir.path());

        audit
            .append("spotify", &outcome(OutcomeStatus::FileNotFound))
            .await
            .unwrap();
        audit
            .append("spotify", &outcome(OutcomeStatus::Success))
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(audit.log_path("spotify"))
            .await
            .unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["status"], "file_not_found");

        assert_eq!(
            audit.last_status("spotify").await,
            LastStatus::Status("success".to_string())
        );
    }

    #[tokio::test]
    async fn status_field_absent_reads_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::new(dir.path());
        tokio::fs::write(audit.log_path("spotify"), "{\"platform\":\"spotify\"}\n")
            .await
            .unwrap();
        assert_eq!(
            audit.last_status("spotify").await,
            LastStatus::Status("unknown".to_string())
        );
    }
}
