use std::collections::BTreeMap;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::status::StatusAggregator;

/// 一处期望与观察不一致
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Mismatch {
    pub platform: String,
    pub expected: String,
    pub observed: String,
}

/// 对账结果。没收敛不是错误：聚合有延迟是正常现象，照实上报。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcileReport {
    pub converged: bool,
    pub attempts: u32,
    pub mismatches: Vec<Mismatch>,
}

/// 对账循环：反复拉新快照和期望比对，直到一致或预算用尽
///
/// 每轮比较的是两边都有的键，值不同才算不一致。比中间不睡，
/// 轮与轮之间睡 `interval`，最后一轮之后不再睡。
pub async fn reconcile(
    aggregator: &StatusAggregator,
    expected: &BTreeMap<String, String>,
    max_attempts: u32,
    interval: Duration,
) -> ReconcileReport {
    let mut last_mismatches = Vec::new();

    for attempt in 1..=max_attempts {
        let snapshot = aggregator.snapshot().await;

        let mismatches: Vec<Mismatch> = expected
            .iter()
            .filter_map(|(platform, expected_status)| {
                let observed = snapshot.platforms.get(platform)?;
                (observed != expected_status).then(|| Mismatch {
                    platform: platform.clone(),
                    expected: expected_status.clone(),
                    observed: observed.clone(),
                })
            })
            .collect();

        if mismatches.is_empty() {
            return ReconcileReport {
                converged: true,
                attempts: attempt,
                mismatches: Vec::new(),
            };
        }

        tracing::debug!(attempt, count = mismatches.len(), "reconcile mismatches, retrying");
        last_mismatches = mismatches;

        if attempt < max_attempts {
            tokio::time::sleep(interval).await;
        }
    }

    ReconcileReport {
        converged: false,
        attempts: max_attempts,
        mismatches: last_mismatches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use crate::core::types::{OutcomeStatus, UploadOutcome, UploadRequest};

    fn outcome(platform: &str, status: OutcomeStatus) -> UploadOutcome {
        let request = UploadRequest::new("asset-1", "/tmp/a.mp3", 1);
        UploadOutcome::new(platform, &request, status)
    }

    fn raw_line(status: &str) -> String {
        format!("{{\"status\":\"{status}\"}}\n")
    }

    #[tokio::test]
    async fn converges_immediately_when_statuses_match() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::new(dir.path());
        audit.append("spotify", &outcome("spotify", OutcomeStatus::Success)).await.unwrap();

        let aggregator = StatusAggregator::new(audit, vec!["spotify".to_string()], dir.path());

        let mut expected = BTreeMap::new();
        expected.insert("spotify".to_string(), "success".to_string());

        let report = reconcile(&aggregator, &expected, 3, Duration::from_millis(10)).await;
        assert!(report.converged);
        assert_eq!(report.attempts, 1);
        assert!(report.mismatches.is_empty());
    }

    #[tokio::test]
    async fn converges_once_lagging_platform_catches_up() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::new(dir.path());

        // attempt 1 看到的快照：spotify=success, apple=pending
        tokio::fs::write(audit.log_path("spotify"), raw_line("success")).await.unwrap();
        tokio::fs::write(audit.log_path("apple"), raw_line("pending")).await.unwrap();

        let aggregator = StatusAggregator::new(
            audit.clone(),
            vec!["spotify".to_string(), "apple".to_string()],
            dir.path(),
        );

        let mut expected = BTreeMap::new();
        expected.insert("spotify".to_string(), "success".to_string());
        expected.insert("apple".to_string(), "error".to_string());

        // 第一轮之后补一条 apple=error，第二轮快照就能看到
        let apple_log = audit.log_path("apple");
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(15)).await;
            let mut content = tokio::fs::read_to_string(&apple_log).await.unwrap();
            content.push_str(&raw_line("error"));
            tokio::fs::write(&apple_log, content).await.unwrap();
        });

        let report = reconcile(&aggregator, &expected, 3, Duration::from_millis(60)).await;
        writer.await.unwrap();

        assert!(report.converged);
        assert_eq!(report.attempts, 2);
        assert!(report.mismatches.is_empty());
    }

    #[tokio::test]
    async fn exhaustion_reports_last_mismatches_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::new(dir.path());
        tokio::fs::write(audit.log_path("apple"), raw_line("pending")).await.unwrap();

        let aggregator = StatusAggregator::new(audit, vec!["apple".to_string()], dir.path());

        let mut expected = BTreeMap::new();
        expected.insert("apple".to_string(), "error".to_string());

        let report = reconcile(&aggregator, &expected, 3, Duration::from_millis(5)).await;
        assert!(!report.converged);
        assert_eq!(report.attempts, 3);
        assert_eq!(
            report.mismatches,
            vec![Mismatch {
                platform: "apple".to_string(),
                expected: "error".to_string(),
                observed: "pending".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn keys_missing_from_snapshot_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::new(dir.path());
        tokio::fs::write(audit.log_path("spotify"), raw_line("success")).await.unwrap();

        // 聚合器只配了 spotify，期望里多出来的键不参与比对
        let aggregator = StatusAggregator::new(audit, vec!["spotify".to_string()], dir.path());

        let mut expected = BTreeMap::new();
        expected.insert("spotify".to_string(), "success".to_string());
        expected.insert("unconfigured".to_string(), "success".to_string());

        let report = reconcile(&aggregator, &expected, 2, Duration::from_millis(5)).await;
        assert!(report.converged);
    }
}
