use std::path::Path;
use std::time::Duration;
use async_trait::async_trait;
use crate::core::errors::Result;

/// 浏览器自动化驱动接口
///
/// 上传状态机只依赖这个接口，真实实现走 WebDriver 协议，
/// 测试注入假驱动统计调用次数。
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// 跳转页面
    async fn goto(&self, url: &str) -> Result<()>;

    /// 填充输入框
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    /// 点击元素
    async fn click(&self, selector: &str) -> Result<()>;

    /// 下拉框选择
    async fn select_option(&self, selector: &str, value: &str) -> Result<()>;

    /// 把文件路径交给 input[type=file]
    async fn set_input_file(&self, selector: &str, path: &Path) -> Result<()>;

    /// 在预算内等元素出现；没出现返回 Ok(false)，调用方决定是否算失败
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// 导出当前会话的 cookie/storage 状态
    async fn storage_state(&self) -> Result<serde_json::Value>;

    /// 恢复之前导出的会话状态
    async fn restore_storage_state(&self, state: &serde_json::Value) -> Result<()>;

    /// 截图（PNG 字节）
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// 关闭浏览器。每个打开的实例在所有退出路径上都必须关闭
    async fn close(&self) -> Result<()>;
}

/// 驱动工厂：每次分发单独拉起一个浏览器实例
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserDriver>>;
}
