use std::collections::HashMap;
use std::sync::Arc;
use futures::future::join_all;
use crate::alert::{Notifier, WebhookNotifier};
use crate::audit::AuditLog;
use crate::browser::{DriverFactory, WebDriverFactory};
use crate::config::DistributionConfig;
use crate::session::SessionStore;
use crate::status::{CountsProvider, StatusAggregator};
use crate::vault::{self, SecretStore};
use super::errors::{DistributeError, Result};
use super::platform::PlatformSpec;
use super::types::{UploadOutcome, UploadRequest};
use super::uploader::PlatformUploader;

/// 分发器：按配置装好全部组件，对外提供单平台和全平台分发
pub struct Distributor {
    uploaders: HashMap<&'static str, PlatformUploader>,
    aggregator: StatusAggregator,
}

impl Distributor {
    pub fn builder(config: DistributionConfig) -> DistributorBuilder {
        DistributorBuilder::new(config)
    }

    pub fn uploader(&self, platform: &str) -> Option<&PlatformUploader> {
        self.uploaders.get(platform)
    }

    pub fn aggregator(&self) -> &StatusAggregator {
        &self.aggregator
    }

    /// 向单个平台分发
    pub async fn dispatch(&self, platform: &str, request: &UploadRequest) -> Result<UploadOutcome> {
        let uploader = self
            .uploaders
            .get(platform)
            .ok_or_else(|| DistributeError::UnknownPlatform(platform.to_string()))?;

        Ok(uploader.dispatch(request).await)
    }

    /// 向全部内置平台并发分发，各平台结果互不影响
    pub async fn dispatch_all(&self, request: &UploadRequest) -> Vec<UploadOutcome> {
        let futures = self
            .uploaders
            .values()
            .map(|uploader| uploader.dispatch(request));

        join_all(futures).await
    }
}

/// 分发器构建器
///
/// 配置显式传入，这里把凭据后端、会话存储、审计日志、告警通道和
/// 浏览器驱动装配到每个平台的上传器上。
pub struct DistributorBuilder {
    config: DistributionConfig,
    specs: Vec<PlatformSpec>,
    secrets: Option<Arc<dyn SecretStore>>,
    driver_factory: Option<Arc<dyn DriverFactory>>,
    notifier: Option<Arc<dyn Notifier>>,
    counts_provider: Option<Arc<dyn CountsProvider>>,
}

impl DistributorBuilder {
    pub fn new(config: DistributionConfig) -> Self {
        Self {
            config,
            specs: PlatformSpec::builtin(),
            secrets: None,
            driver_factory: None,
            notifier: None,
            counts_provider: None,
        }
    }

    /// 覆盖平台清单（默认四个内置平台）
    pub fn platforms(mut self, specs: Vec<PlatformSpec>) -> Self {
        self.specs = specs;
        self
    }

    /// 注入凭据后端，默认按配置打开
    pub fn secret_store(mut self, secrets: Arc<dyn SecretStore>) -> Self {
        self.secrets = Some(secrets);
        self
    }

    /// 注入浏览器驱动工厂，测试用假驱动替换
    pub fn driver_factory(mut self, factory: Arc<dyn DriverFactory>) -> Self {
        self.driver_factory = Some(factory);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn counts_provider(mut self, provider: Arc<dyn CountsProvider>) -> Self {
        self.counts_provider = Some(provider);
        self
    }

    pub fn build(self) -> Result<Distributor> {
        let config = Arc::new(self.config);

        let secrets = match self.secrets {
            Some(secrets) => secrets,
            None => vault::open(&config.secrets),
        };

        let driver_factory: Arc<dyn DriverFactory> = match self.driver_factory {
            Some(factory) => factory,
            None => Arc::new(WebDriverFactory::new(&config.webdriver)?),
        };

        let notifier: Arc<dyn Notifier> = match self.notifier {
            Some(notifier) => notifier,
            None => Arc::new(WebhookNotifier::new(config.alert_webhook.clone())),
        };

        let sessions = SessionStore::new(config.sessions_dir.clone());
        let audit = AuditLog::new(config.logs_dir.clone());

        let mut uploaders = HashMap::new();
        for spec in self.specs {
            let name = spec.name;
            let uploader = PlatformUploader::new(
                spec,
                config.clone(),
                secrets.clone(),
                sessions.clone(),
                driver_factory.clone(),
                audit.clone(),
                notifier.clone(),
            );
            uploaders.insert(name, uploader);
        }

        let mut aggregator = StatusAggregator::new(
            audit,
            config.platform_names(),
            config.logs_dir.clone(),
        );
        if let Some(provider) = self.counts_provider {
            aggregator = aggregator.with_counts_provider(provider);
        }

        Ok(Distributor {
            uploaders,
            aggregator,
        })
    }
}
