use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::{debug, info};

use crate::config::AgentConfig;

/// The browser operations the agent consumes. One implementation drives
/// Chrome; tests substitute an in-memory page.
///
/// Every method may fail. Callers that must not fail go through
/// [`crate::primitives`], which converts faults into plain results.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate and wait for the load to finish.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Wait for `selector` to appear, then click it.
    async fn click(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Wait for `selector` to appear, clear its value and type `text` into it.
    async fn fill(&self, selector: &str, text: &str, timeout: Duration) -> Result<()>;

    /// Wait for `selector` to appear and return its `textContent`, which
    /// includes text hidden by CSS. Empty when the node has none.
    async fn text_content(&self, selector: &str, timeout: Duration) -> Result<String>;

    /// Evaluate a script expression against the live document.
    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value>;

    async fn url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;
}

/// A Chrome tab. headless_chrome is blocking, so every call is moved onto
/// the blocking pool with its own handle to the tab.
#[derive(Clone)]
pub struct ChromePage {
    tab: Arc<Tab>,
}

impl ChromePage {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Tab) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || f(&tab))
            .await
            .map_err(|e| anyhow!("browser task panicked: {}", e))?
    }
}

#[async_trait]
impl Page for ChromePage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
        let url = url.to_string();
        self.blocking(move |tab| {
            tab.set_default_timeout(timeout);
            tab.navigate_to(&url)?.wait_until_navigated()?;
            Ok(())
        })
        .await
    }

    async fn click(&self, selector: &str, timeout: Duration) -> Result<()> {
        let selector = selector.to_string();
        self.blocking(move |tab| {
            let el = tab.wait_for_element_with_custom_timeout(&selector, timeout)?;
            el.click()?;
            Ok(())
        })
        .await
    }

    async fn fill(&self, selector: &str, text: &str, timeout: Duration) -> Result<()> {
        let selector = selector.to_string();
        let text = text.to_string();
        self.blocking(move |tab| {
            let el = tab.wait_for_element_with_custom_timeout(&selector, timeout)?;
            el.click()?;
            el.call_js_fn("function() { this.value = ''; }", vec![], false)?;
            el.type_into(&text)?;
            Ok(())
        })
        .await
    }

    async fn text_content(&self, selector: &str, timeout: Duration) -> Result<String> {
        let selector = selector.to_string();
        self.blocking(move |tab| {
            let el = tab.wait_for_element_with_custom_timeout(&selector, timeout)?;
            let result = el.call_js_fn("function() { return this.textContent; }", vec![], false)?;
            Ok(result
                .value
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_default())
        })
        .await
    }

    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value> {
        let expression = expression.to_string();
        self.blocking(move |tab| {
            let result = tab.evaluate(&expression, false)?;
            Ok(result.value.unwrap_or(serde_json::Value::Null))
        })
        .await
    }

    async fn url(&self) -> Result<String> {
        self.blocking(|tab| Ok(tab.get_url())).await
    }

    async fn title(&self) -> Result<String> {
        self.blocking(|tab| tab.get_title()).await
    }
}

/// One Chrome process with one page, owned for a single setup/cleanup bracket.
pub struct BrowserSession {
    _browser: Browser,
    page: ChromePage,
}

impl BrowserSession {
    /// Launch Chrome and open a blank page. Blocking; call from
    /// `spawn_blocking` when inside the runtime.
    pub fn launch(config: &AgentConfig) -> Result<Self> {
        info!("[Setup] Starting browser (headless: {})...", config.headless);

        let options = LaunchOptions {
            headless: config.headless,
            path: config.chrome_path.as_ref().map(PathBuf::from),
            args: vec![
                OsStr::new("--no-first-run"),
                OsStr::new("--no-default-browser-check"),
                OsStr::new("--disable-blink-features=AutomationControlled"),
                OsStr::new("--disable-infobars"),
            ],
            idle_browser_timeout: Duration::from_secs(300),
            ..Default::default()
        };

        let browser = Browser::new(options).map_err(|e| anyhow!("Browser launch failed: {}", e))?;

        debug!("[Setup] Chrome started, creating tab...");
        let tab = browser.new_tab()?;
        tab.set_default_timeout(config.nav_timeout);
        tab.navigate_to("about:blank")?;

        info!("[Setup] Browser ready!");
        Ok(Self {
            _browser: browser,
            page: ChromePage::new(tab),
        })
    }

    /// A handle to the session's page. Valid while the session is alive.
    pub fn page(&self) -> ChromePage {
        self.page.clone()
    }

    pub fn close(self) {
        info!("[Cleanup] Closing browser...");
        drop(self);
        info!("[Cleanup] Done");
    }
}
