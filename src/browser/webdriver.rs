use std::path::Path;
use std::time::Duration;
use async_trait::async_trait;
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use url::Url;
use super::driver::{BrowserDriver, DriverFactory};
use crate::config::WebDriverConfig;
use crate::core::errors::{DistributeError, Result};

/// W3C 协议里元素 id 的固定键名
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// WebDriver 工厂，对着 chromedriver 兼容端点建会话
pub struct WebDriverFactory {
    client: Client,
    endpoint: Url,
    headless: bool,
}

impl WebDriverFactory {
    pub fn new(config: &WebDriverConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|_| DistributeError::ParamError(format!("Invalid url: {:?}", config.endpoint)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            headless: config.headless,
        })
    }
}

#[async_trait]
impl DriverFactory for WebDriverFactory {
    async fn launch(&self) -> Result<Box<dyn BrowserDriver>> {
        let mut args = vec!["--no-sandbox".to_string(), "--window-size=1440,900".to_string()];
        if self.headless {
            args.push("--headless=new".to_string());
        }

        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        let response = self
            .client
            .post(self.endpoint.join("session").unwrap_or_else(|_| self.endpoint.clone()))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DistributeError::server_error(
                status.as_u16(),
                "Failed to create WebDriver session",
            ));
        }

        let value: Value = response.json().await?;
        let session_id = value["value"]["sessionId"]
            .as_str()
            .ok_or_else(|| DistributeError::driver("No sessionId in WebDriver response"))?
            .to_string();

        let mut base = self.endpoint.to_string();
        while base.ends_with('/') {
            base.pop();
        }

        Ok(Box::new(WebDriverSession {
            client: self.client.clone(),
            base: format!("{base}/session/{session_id}"),
        }))
    }
}

/// 单个 WebDriver 会话
pub struct WebDriverSession {
    client: Client,
    base: String,
}

impl WebDriverSession {
    async fn command(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.base, path);
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let value: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let message = value["value"]["message"].as_str().unwrap_or("WebDriver command failed");
            return Err(DistributeError::server_error(status.as_u16(), message));
        }

        Ok(value)
    }

    /// 找元素，找不到返回 None（协议用 404 表达 no such element）
    async fn find_element(&self, selector: &str) -> Result<Option<String>> {
        let url = format!("{}/element", self.base);
        let response = self
            .client
            .post(url)
            .json(&json!({ "using": "css selector", "value": selector }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let value: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let message = value["value"]["message"].as_str().unwrap_or("element lookup failed");
            return Err(DistributeError::server_error(status.as_u16(), message));
        }

        Ok(value["value"][ELEMENT_KEY].as_str().map(String::from))
    }

    async fn require_element(&self, selector: &str) -> Result<String> {
        self.find_element(selector)
            .await?
            .ok_or_else(|| DistributeError::driver(format!("Element not found: {selector}")))
    }

    async fn send_keys(&self, element_id: &str, text: &str) -> Result<()> {
        self.command(
            reqwest::Method::POST,
            &format!("/element/{element_id}/value"),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for WebDriverSession {
    async fn goto(&self, url: &str) -> Result<()> {
        self.command(reqwest::Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let element_id = self.require_element(selector).await?;
        self.command(
            reqwest::Method::POST,
            &format!("/element/{element_id}/clear"),
            Some(json!({})),
        )
        .await?;
        self.send_keys(&element_id, value).await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element_id = self.require_element(selector).await?;
        self.command(
            reqwest::Method::POST,
            &format!("/element/{element_id}/click"),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
        // 对 select 元素发送文本即可选中匹配的 option
        let element_id = self.require_element(selector).await?;
        self.send_keys(&element_id, value).await
    }

    async fn set_input_file(&self, selector: &str, path: &Path) -> Result<()> {
        let element_id = self.require_element(selector).await?;
        self.send_keys(&element_id, &path.to_string_lossy()).await
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.find_element(selector).await?.is_some() {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn storage_state(&self) -> Result<Value> {
        let value = self.command(reqwest::Method::GET, "/cookie", None).await?;
        Ok(json!({ "cookies": value["value"] }))
    }

    async fn restore_storage_state(&self, state: &Value) -> Result<()> {
        let Some(cookies) = state["cookies"].as_array() else {
            return Ok(());
        };

        // 跨域 cookie 必须先站到对应域名下才能写入
        if let Some(domain) = cookies
            .iter()
            .find_map(|c| c["domain"].as_str())
        {
            let host = domain.trim_start_matches('.');
            let origin = Url::parse(&format!("https://{host}/"))
                .map_err(|_| DistributeError::ParamError(format!("Invalid cookie domain: {domain:?}")))?;
            self.goto(origin.as_str()).await?;
        }

        for cookie in cookies {
            self.command(
                reqwest::Method::POST,
                "/cookie",
                Some(json!({ "cookie": cookie })),
            )
            .await?;
        }

        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let value = self.command(reqwest::Method::GET, "/screenshot", None).await?;
        let encoded = value["value"]
            .as_str()
            .ok_or_else(|| DistributeError::driver("No screenshot payload"))?;

        BASE64_STANDARD
            .decode(encoded)
            .map_err(|err| DistributeError::driver(format!("Bad screenshot payload: {err}")))
    }

    async fn close(&self) -> Result<()> {
        let response = self.client.delete(&self.base).send().await?;
        let status = response.status();
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(DistributeError::server_error(status.as_u16(), "Failed to close session"));
        }
        Ok(())
    }
}
