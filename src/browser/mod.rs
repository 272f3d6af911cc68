mod driver;
mod webdriver;

pub use driver::{BrowserDriver, DriverFactory};
pub use webdriver::{WebDriverFactory, WebDriverSession};
