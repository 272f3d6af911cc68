use std::sync::Arc;
use chrono::Utc;
use crate::alert::Notifier;
use crate::audit::AuditLog;
use crate::browser::{BrowserDriver, DriverFactory};
use crate::config::DistributionConfig;
use crate::session::{SessionDescriptor, SessionStore};
use crate::status::StatusPushClient;
use crate::utils::best_effort;
use crate::vault::SecretStore;
use super::errors::{DistributeError, Result};
use super::platform::PlatformSpec;
use super::types::{ExternalSummary, OutcomeStatus, UploadOutcome, UploadRequest};

/// 平台上传器：四个平台共用的分发状态机
///
/// 终态按固定顺序判定，命中即返回：
/// 配置关闭 -> demo 模拟 -> 凭据缺失 -> 文件缺失 -> 真实上传 -> 异常。
/// 免费的检查放最前面，浏览器这种昂贵资源只有前面全过了才碰。
pub struct PlatformUploader {
    spec: PlatformSpec,
    config: Arc<DistributionConfig>,
    secrets: Arc<dyn SecretStore>,
    sessions: SessionStore,
    driver_factory: Arc<dyn DriverFactory>,
    audit: AuditLog,
    notifier: Arc<dyn Notifier>,
}

impl PlatformUploader {
    pub fn new(
        spec: PlatformSpec,
        config: Arc<DistributionConfig>,
        secrets: Arc<dyn SecretStore>,
        sessions: SessionStore,
        driver_factory: Arc<dyn DriverFactory>,
        audit: AuditLog,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            spec,
            config,
            secrets,
            sessions,
            driver_factory,
            audit,
            notifier,
        }
    }

    pub fn platform(&self) -> &'static str {
        self.spec.name
    }

    /// 执行一次分发，返回终态
    ///
    /// 每次调用固定追加一条审计记录；审计、告警、聚合器推送都是
    /// 旁路，它们失败不会改变返回的结果。
    pub async fn dispatch(&self, request: &UploadRequest) -> UploadOutcome {
        let outcome = match self.evaluate(request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                // 异常信息原样进记录
                UploadOutcome::new(self.spec.name, request, OutcomeStatus::Error)
                    .with_error(err.to_string())
            }
        };

        tracing::info!(
            platform = self.spec.name,
            asset_id = %request.asset_id,
            account_id = request.account_id,
            status = %outcome.status,
            "dispatch finished"
        );

        best_effort(
            "audit append",
            self.audit.append(self.spec.name, &outcome),
        )
        .await;

        if outcome.status.should_alert() {
            let subject = format!("{} Upload Failed: {}", self.spec.name, request.asset_id);
            let body = format!(
                "Account {} error: {}",
                request.account_id,
                outcome.error.as_deref().unwrap_or("unknown")
            );
            self.notifier.notify(&subject, &body).await;
        }

        if outcome.status == OutcomeStatus::DemoSimulated {
            self.push_demo_notification(request);
        }

        outcome
    }

    async fn evaluate(&self, request: &UploadRequest) -> Result<UploadOutcome> {
        // 1. 配置开关，免费检查，不碰凭据
        if !self.config.platform_enabled(self.spec.name) {
            return Ok(UploadOutcome::new(
                self.spec.name,
                request,
                OutcomeStatus::DisabledInConfig,
            ));
        }

        // 2. demo 模式：不开浏览器，记一条合成的成功
        if self.config.is_demo() {
            return Ok(UploadOutcome::new(
                self.spec.name,
                request,
                OutcomeStatus::DemoSimulated,
            )
            .with_track_id(request.asset_id.clone()));
        }

        // 3. 凭据。查不到和后端够不着是两回事，后者走 Err
        let scope = self.spec.credential_scope(request.account_id);
        let (username_key, password_key) = self.spec.credential_keys;
        let username = self.secrets.get(&scope, username_key).await?;
        let password = self.secrets.get(&scope, password_key).await?;

        let (Some(username), Some(password)) = (username, password) else {
            return Ok(UploadOutcome::new(
                self.spec.name,
                request,
                self.spec.credential_kind.missing_status(),
            ));
        };

        // 4. 源文件，浏览器开起来之前最后一道便宜的前置检查
        if tokio::fs::metadata(&request.file_path).await.is_err() {
            return Ok(UploadOutcome::new(
                self.spec.name,
                request,
                OutcomeStatus::FileNotFound,
            ));
        }

        // 5. 真实上传
        self.run_live(request, &username, &password).await?;

        Ok(UploadOutcome::new(self.spec.name, request, OutcomeStatus::Success)
            .with_track_id(request.asset_id.clone()))
    }

    async fn run_live(&self, request: &UploadRequest, username: &str, password: &str) -> Result<()> {
        let session = self
            .sessions
            .load(self.spec.name, request.account_id)
            .await?;

        let driver = self.driver_factory.launch().await?;

        let result = self
            .drive_upload(driver.as_ref(), request, session, username, password)
            .await;

        if result.is_err() {
            self.capture_failure_screenshot(driver.as_ref(), request).await;
        }

        // 浏览器在所有退出路径上都要关掉，泄漏驱动实例是正确性问题
        if let Err(err) = driver.close().await {
            tracing::warn!(platform = self.spec.name, error = %err, "failed to close browser");
        }

        result
    }

    async fn drive_upload(
        &self,
        driver: &dyn BrowserDriver,
        request: &UploadRequest,
        session: Option<SessionDescriptor>,
        username: &str,
        password: &str,
    ) -> Result<()> {
        let selectors = &self.spec.selectors;
        let timeouts = &self.config.timeouts;

        // 有会话描述符就跳过交互式登录
        match session {
            Some(descriptor) => {
                driver.restore_storage_state(&descriptor.storage_state).await?;
            }
            None => {
                self.login(driver, username, password).await?;
            }
        }

        driver.goto(self.spec.upload_url).await?;

        if !driver.wait_for(selectors.file_input, timeouts.selector()).await? {
            return Err(DistributeError::SelectorTimeout {
                selector: selectors.file_input.to_string(),
                waited_secs: timeouts.selector_secs,
            });
        }
        driver
            .set_input_file(selectors.file_input, &request.file_path)
            .await?;

        // 元数据字段各自独立，缺了就不填
        let metadata = &request.metadata;
        if let Some(title) = &metadata.title {
            driver.fill(selectors.title, title).await?;
        }
        if let Some(description) = &metadata.description {
            driver.fill(selectors.description, description).await?;
        }
        if let Some(tags) = &metadata.tags {
            driver.fill(selectors.tags, &tags.join(", ")).await?;
        }
        if let Some(genre) = &metadata.genre {
            // 下拉框选不中不拦着上传
            if let Err(err) = driver.select_option(selectors.genre, genre).await {
                tracing::debug!(platform = self.spec.name, error = %err, "genre select skipped");
            }
        }

        driver.click(selectors.submit).await?;

        // 完成标志没等到只记一笔，不降级结果
        match driver.wait_for(selectors.completion_marker, timeouts.completion()).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(platform = self.spec.name, "completion marker not observed");
            }
            Err(err) => {
                tracing::debug!(platform = self.spec.name, error = %err, "completion wait failed");
            }
        }

        // 每次无异常的尝试之后都刷新会话，平台轮换 cookie 也不会作废下次运行
        let state = driver.storage_state().await?;
        self.sessions
            .save(&SessionDescriptor::new(
                self.spec.name,
                request.account_id,
                state,
            ))
            .await?;

        Ok(())
    }

    async fn login(&self, driver: &dyn BrowserDriver, username: &str, password: &str) -> Result<()> {
        let selectors = &self.spec.selectors;

        driver.goto(self.spec.login_url).await?;
        driver.fill(selectors.login_username, username).await?;
        driver.fill(selectors.login_password, password).await?;
        driver.click(selectors.login_submit).await?;

        // 登录标志必须在预算内出现
        if !driver
            .wait_for(selectors.post_login_marker, self.config.timeouts.login())
            .await?
        {
            return Err(DistributeError::SelectorTimeout {
                selector: selectors.post_login_marker.to_string(),
                waited_secs: self.config.timeouts.login_secs,
            });
        }

        Ok(())
    }

    async fn capture_failure_screenshot(&self, driver: &dyn BrowserDriver, request: &UploadRequest) {
        let dir = self.config.logs_dir.join("screenshots");
        let path = dir.join(format!(
            "{}_{}_{}.png",
            self.spec.name,
            request.asset_id,
            Utc::now().timestamp_millis()
        ));

        best_effort("failure screenshot", async {
            let bytes = driver.screenshot().await?;
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(&path, bytes).await?;
            Ok(())
        })
        .await;
    }

    /// demo 结果向聚合器推一条通知，不等回应也不关心结果
    fn push_demo_notification(&self, request: &UploadRequest) {
        let Some(push_url) = &self.config.aggregator_push_url else {
            return;
        };

        let client = StatusPushClient::new(push_url);
        let summary = ExternalSummary::new(
            "demo_simulated",
            format!(
                "{} simulated upload of {} for account {}",
                self.spec.name, request.asset_id, request.account_id
            ),
        );

        tokio::spawn(async move {
            best_effort("aggregator push", client.push(&summary)).await;
        });
    }
}
