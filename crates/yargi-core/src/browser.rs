//! Headless browser driver for the one upstream that cannot be driven over
//! plain HTTP.
//!
//! A single Chromium instance with a single page is launched lazily on first
//! use and reused across calls. Callers take a [`BrowserSession`] guard,
//! which holds the driver mutex for the whole logical transaction, so a
//! targeted search followed by a preview postback can never interleave with
//! another caller's operations.

use std::time::Duration;

use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{Error, Result};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

struct SessionState {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: Page,
}

/// Long-lived driver owning the shared browser. One in-flight operation at a
/// time; callers serialize on the internal mutex via [`BrowserDriver::session`].
pub struct BrowserDriver {
    state: Mutex<Option<SessionState>>,
    op_timeout: Duration,
}

impl BrowserDriver {
    /// Create a driver with the default 60 s per-operation deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(60))
    }

    /// Create a driver with a custom per-operation deadline.
    #[must_use]
    pub fn with_timeout(op_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(None),
            op_timeout,
        }
    }

    /// Acquire the browser for a logical transaction, launching it on first
    /// use. The returned guard keeps every other caller out until dropped.
    pub async fn session(&self) -> Result<BrowserSession<'_>> {
        let mut guard = self.state.lock().await;
        if guard.is_none() {
            *guard = Some(Self::launch().await?);
        }
        Ok(BrowserSession {
            guard,
            op_timeout: self.op_timeout,
        })
    }

    async fn launch() -> Result<SessionState> {
        info!("launching headless browser");
        let config = BrowserConfig::builder()
            .args(vec![format!("--user-agent={USER_AGENT}")])
            .build()
            .map_err(Error::Browser)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| Error::Browser(format!("browser launch failed: {e}")))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser event loop error");
                }
            }
        });
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| Error::Browser(format!("initial page failed: {e}")))?;
        Ok(SessionState {
            browser,
            handler_task,
            page,
        })
    }

    /// Close page, browser and event loop. Safe to call more than once.
    pub async fn close(&self) {
        let mut guard = self.state.lock().await;
        if let Some(mut state) = guard.take() {
            if let Err(e) = state.browser.close().await {
                warn!(error = %e, "browser close failed");
            }
            let _ = state.browser.wait().await;
            state.handler_task.abort();
            info!("headless browser closed");
        }
    }
}

impl Default for BrowserDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive handle on the shared page for the duration of one transaction.
pub struct BrowserSession<'a> {
    guard: MutexGuard<'a, Option<SessionState>>,
    op_timeout: Duration,
}

impl BrowserSession<'_> {
    fn state(&self) -> Result<&SessionState> {
        self.guard
            .as_ref()
            .ok_or_else(|| Error::Browser("browser session was closed".into()))
    }

    async fn timed<T>(
        &self,
        what: &str,
        fut: impl std::future::Future<Output = std::result::Result<T, CdpError>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Error::Browser(format!("{what}: {e}"))),
            Err(_) => Err(Error::Timeout(format!("{what} exceeded deadline"))),
        }
    }

    /// Current page URL, empty when unknown.
    pub async fn current_url(&self) -> Result<String> {
        let state = self.state()?;
        let url = self
            .timed("read url", state.page.url())
            .await?
            .unwrap_or_default();
        Ok(url)
    }

    /// Navigate the shared page and wait for the load to settle. On failure
    /// the page is replaced with a fresh one while the context is kept.
    pub async fn navigate(&mut self, url: &str) -> Result<()> {
        debug!(url, "browser navigate");
        let result = {
            let state = self.state()?;
            self.timed("navigate", async {
                state.page.goto(url).await?;
                state.page.wait_for_navigation().await?;
                Ok(())
            })
            .await
        };
        if result.is_err() {
            self.reset_page().await;
        }
        result
    }

    /// Set an input's value through the live DOM.
    pub async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let expr = format!(
            "document.querySelector({sel}).value = {val};",
            sel = js_string(selector),
            val = js_string(value)
        );
        self.eval_unit(&expr).await
    }

    /// Set a `<select>`'s value through the live DOM.
    pub async fn select_value(&self, selector: &str, value: &str) -> Result<()> {
        let expr = format!(
            "document.querySelector({sel}).value = {val};",
            sel = js_string(selector),
            val = js_string(value)
        );
        self.eval_unit(&expr).await
    }

    /// Click an element by selector.
    pub async fn click(&self, selector: &str) -> Result<()> {
        let state = self.state()?;
        self.timed("click", async {
            state.page.find_element(selector).await?.click().await?;
            Ok(())
        })
        .await
    }

    /// Trigger an ASP.NET `__doPostBack` for `target` and wait for the
    /// resulting navigation to settle.
    pub async fn eval_postback(&mut self, target: &str) -> Result<()> {
        debug!(target, "postback");
        let expr = format!("__doPostBack({}, '')", js_string(target));
        let result = {
            let state = self.state()?;
            self.timed("postback", async {
                state.page.evaluate(expr.as_str()).await?;
                state.page.wait_for_navigation().await?;
                Ok(())
            })
            .await
        };
        if result.is_err() {
            self.reset_page().await;
        }
        result
    }

    /// Run a JavaScript expression, discarding its value.
    pub async fn eval_unit(&self, expr: &str) -> Result<()> {
        let state = self.state()?;
        self.timed("evaluate", async {
            state.page.evaluate(expr).await?;
            Ok(())
        })
        .await
    }

    /// Run a JavaScript expression and read it back as a string.
    pub async fn eval_string(&self, expr: &str) -> Result<Option<String>> {
        let state = self.state()?;
        let value = self
            .timed("evaluate", state.page.evaluate(expr))
            .await?
            .into_value::<Option<String>>()
            .map_err(|e| Error::Browser(format!("evaluate result: {e}")))?;
        Ok(value)
    }

    /// Run a JavaScript predicate and read it back as a boolean.
    pub async fn eval_bool(&self, expr: &str) -> Result<bool> {
        let state = self.state()?;
        let value = self
            .timed("evaluate", state.page.evaluate(expr))
            .await?
            .into_value::<Option<bool>>()
            .map_err(|e| Error::Browser(format!("evaluate result: {e}")))?;
        Ok(value.unwrap_or(false))
    }

    /// Poll until `selector` is attached to the DOM or the deadline expires.
    pub async fn wait_for_selector(&self, selector: &str) -> Result<()> {
        let state = self.state()?;
        let deadline = tokio::time::Instant::now() + self.op_timeout;
        loop {
            if state.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Timeout(format!("selector `{selector}` never appeared")));
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    /// Poll a JavaScript predicate until it returns `true` or the deadline
    /// expires.
    pub async fn wait_for_predicate(&self, predicate: &str) -> Result<()> {
        let deadline = tokio::time::Instant::now() + self.op_timeout;
        loop {
            if self.eval_bool(predicate).await.unwrap_or(false) {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Timeout("predicate never became true".into()));
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    /// Full HTML of the shared page.
    pub async fn content(&self) -> Result<String> {
        let state = self.state()?;
        self.timed("page content", state.page.content()).await
    }

    /// Load `url` on a throwaway page in the same context and return its
    /// HTML. Used for iframe targets that must not disturb the shared page.
    pub async fn open_child_page(&self, url: &str) -> Result<String> {
        debug!(url, "child page");
        let state = self.state()?;
        let child = self
            .timed("child page open", state.browser.new_page(url))
            .await?;
        let html = self.timed("child page content", child.content()).await;
        if let Err(e) = child.close().await {
            debug!(error = %e, "child page close failed");
        }
        html
    }

    /// Replace the shared page with a fresh one, keeping the context. Called
    /// after navigation failures so the next call starts clean.
    pub async fn reset_page(&mut self) {
        let Some(state) = self.guard.as_mut() else {
            return;
        };
        warn!("resetting browser page after failure");
        if let Ok(page) = state.browser.new_page("about:blank").await {
            let old = std::mem::replace(&mut state.page, page);
            if let Err(e) = old.close().await {
                debug!(error = %e, "stale page close failed");
            }
        }
    }
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_string_escapes_quotes_and_backslashes() {
        assert_eq!(js_string("plain"), "\"plain\"");
        assert_eq!(
            js_string("ctl00$ContentPlaceHolder1$btnAra"),
            "\"ctl00$ContentPlaceHolder1$btnAra\""
        );
        assert_eq!(js_string("a\"b\\c"), "\"a\\\"b\\\\c\"");
    }

    #[tokio::test]
    async fn close_before_first_use_is_a_no_op() {
        let driver = BrowserDriver::new();
        driver.close().await;
        driver.close().await;
    }
}
