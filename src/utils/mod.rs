use std::future::Future;
use crate::core::errors::Result;

/// 尽力而为地执行一个旁路操作
///
/// 审计追加、告警投递、聚合器推送这类旁路失败不允许影响主结果，
/// 统一走这里：失败打一条 warn 然后吞掉。
pub async fn best_effort<F, T>(context: &str, fut: F) -> Option<T>
where
    F: Future<Output = Result<T>>,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(context, error = %err, "best-effort operation failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::DistributeError;

    #[tokio::test]
    async fn best_effort_swallows_errors() {
        let result: Option<()> = best_effort("test", async {
            Err(DistributeError::internal_error("boom"))
        })
        .await;
        assert!(result.is_none());

        let result = best_effort("test", async { Ok(42) }).await;
        assert_eq!(result, Some(42));
    }
}
