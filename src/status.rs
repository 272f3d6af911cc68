use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use crate::audit::AuditLog;
use crate::core::errors::Result;
use crate::core::types::{ExternalSummary, PersistenceCounts};

/// 次级持久化计数来源，只做参考，拿不到不阻塞快照
#[async_trait]
pub trait CountsProvider: Send + Sync {
    async fn counts(&self) -> Result<PersistenceCounts>;
}

/// 次级持久化摘要
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSummary {
    pub connected: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub counts: BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 合并后的状态快照，每次读都重新算，绝不缓存
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusSnapshot {
    /// platform -> 最近一条审计记录的状态
    pub platforms: BTreeMap<String, String>,
    pub storage: StorageSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<ExternalSummary>,
    pub last_updated: DateTime<Utc>,
}

/// 状态聚合器
///
/// 真相源是各平台审计日志的最后一行；次级计数和外部结论只是补充。
pub struct StatusAggregator {
    audit: AuditLog,
    platforms: Vec<String>,
    counts_provider: Option<Arc<dyn CountsProvider>>,
    summary_path: PathBuf,
}

impl StatusAggregator {
    pub fn new(audit: AuditLog, platforms: Vec<String>, logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            audit,
            platforms,
            counts_provider: None,
            summary_path: logs_dir.into().join("test-summary.json"),
        }
    }

    pub fn with_counts_provider(mut self, provider: Arc<dyn CountsProvider>) -> Self {
        self.counts_provider = Some(provider);
        self
    }

    /// 现算一份快照
    pub async fn snapshot(&self) -> StatusSnapshot {
        let mut platforms = BTreeMap::new();
        for platform in &self.platforms {
            let status = self.audit.last_status(platform).await;
            platforms.insert(platform.clone(), status.as_str().to_string());
        }

        let storage = match &self.counts_provider {
            Some(provider) => match provider.counts().await {
                Ok(counts) => StorageSummary {
                    connected: true,
                    counts: counts.counts.into_iter().collect(),
                    error: None,
                },
                Err(err) => StorageSummary {
                    connected: false,
                    counts: BTreeMap::new(),
                    error: Some(err.to_string()),
                },
            },
            None => StorageSummary {
                connected: false,
                counts: BTreeMap::new(),
                error: None,
            },
        };

        StatusSnapshot {
            platforms,
            storage,
            external: self.read_summary().await,
            last_updated: Utc::now(),
        }
    }

    /// 记录外部推送的总体结论（调用方观察到的整体状态）
    pub async fn record_summary(&self, summary: &ExternalSummary) -> Result<()> {
        if let Some(parent) = self.summary_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.summary_path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(summary)?;
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &self.summary_path).await?;

        Ok(())
    }

    async fn read_summary(&self) -> Option<ExternalSummary> {
        let content = tokio::fs::read_to_string(&self.summary_path).await.ok()?;
        serde_json::from_str(&content).ok()
    }
}

/// 聚合器推送客户端：demo 分发之后给聚合端点发一条通知，不等结果
pub struct StatusPushClient {
    client: Client,
    push_url: String,
}

impl StatusPushClient {
    pub fn new(push_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();

        Self {
            client,
            push_url: push_url.into(),
        }
    }

    pub async fn push(&self, summary: &ExternalSummary) -> Result<()> {
        self.client
            .post(&self.push_url)
            .json(summary)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::DistributeError;
    use crate::core::types::{OutcomeStatus, UploadOutcome, UploadRequest};

    struct FixedCounts;

    #[async_trait]
    impl CountsProvider for FixedCounts {
        async fn counts(&self) -> Result<PersistenceCounts> {
            let mut counts = std::collections::HashMap::new();
            counts.insert("ingestion".to_string(), 12);
            counts.insert("normalized".to_string(), 7);
            Ok(PersistenceCounts { counts })
        }
    }

    struct BrokenCounts;

    #[async_trait]
    impl CountsProvider for BrokenCounts {
        async fn counts(&self) -> Result<PersistenceCounts> {
            Err(DistributeError::internal_error("db down"))
        }
    }

    fn platforms() -> Vec<String> {
        vec!["spotify".to_string(), "apple".to_string()]
    }

    #[tokio::test]
    async fn snapshot_reads_logs_fresh_each_call() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::new(dir.path());
        let aggregator = StatusAggregator::new(audit.clone(), platforms(), dir.path());

        let snapshot = aggregator.snapshot().await;
        assert_eq!(snapshot.platforms["spotify"], "no_logs");
        assert_eq!(snapshot.platforms["apple"], "no_logs");

        let request = UploadRequest::new("asset-1", "/tmp/a.mp3", 1);
        audit
            .append("spotify", &UploadOutcome::new("spotify", &request, OutcomeStatus::Success))
            .await
            .unwrap();

        // 不缓存：第二次快照立刻看到新状态
        let snapshot = aggregator.snapshot().await;
        assert_eq!(snapshot.platforms["spotify"], "success");
        assert_eq!(snapshot.platforms["apple"], "no_logs");
    }

    #[tokio::test]
    async fn counts_are_advisory() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::new(dir.path());

        let aggregator = StatusAggregator::new(audit.clone(), platforms(), dir.path())
            .with_counts_provider(Arc::new(FixedCounts));
        let snapshot = aggregator.snapshot().await;
        assert!(snapshot.storage.connected);
        assert_eq!(snapshot.storage.counts["ingestion"], 12);

        let aggregator = StatusAggregator::new(audit, platforms(), dir.path())
            .with_counts_provider(Arc::new(BrokenCounts));
        let snapshot = aggregator.snapshot().await;
        assert!(!snapshot.storage.connected);
        assert!(snapshot.storage.error.as_deref().unwrap().contains("db down"));
        // 计数拿不到不影响平台状态
        assert_eq!(snapshot.platforms["spotify"], "no_logs");
    }

    #[tokio::test]
    async fn recorded_summary_shows_up_in_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::new(dir.path());
        let aggregator = StatusAggregator::new(audit, platforms(), dir.path());

        assert!(aggregator.snapshot().await.external.is_none());

        let summary = ExternalSummary::new("success", "All checks passed");
        aggregator.record_summary(&summary).await.unwrap();

        let external = aggregator.snapshot().await.external.unwrap();
        assert_eq!(external.status, "success");
        assert_eq!(external.details, "All checks passed");
    }
}
