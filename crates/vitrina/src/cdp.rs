//! Chromium engine over the Chrome DevTools Protocol.
//!
//! Only compiled with the `browser` feature. The engine drives Chromium via
//! chromiumoxide; element operations resolve queries in the page with
//! injected JavaScript so refinements (first, nth, text filter) behave the
//! same against the live DOM as against the scripted double.
//!
//! The "trace" is an in-memory action log flushed as JSON on a persisting
//! stop. CDP exposes nothing like a replayable trace archive, so the log is
//! the diagnostic of record for failed tests.

use crate::capability::{Automation, LoadCondition, WaitState};
use crate::config::{BrowserKind, RunConfiguration};
use crate::locator::{ElementQuery, Refinement};
use crate::result::{VitrinaError, VitrinaResult};
use crate::session::Engine;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Interval between DOM polls while waiting on an element
const DOM_POLL: Duration = Duration::from_millis(100);

/// Launches one Chromium process and mints isolated pages as sessions
pub struct ChromiumEngine {
    browser: Arc<Mutex<CdpBrowser>>,
    #[allow(dead_code)]
    handler: tokio::task::JoinHandle<()>,
}

impl std::fmt::Debug for ChromiumEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromiumEngine").finish_non_exhaustive()
    }
}

impl ChromiumEngine {
    /// Launch Chromium per the run configuration.
    ///
    /// Firefox and WebKit configurations are rejected here: CDP drives
    /// Chromium only.
    pub async fn launch(config: &RunConfiguration) -> VitrinaResult<Self> {
        if config.browser != BrowserKind::Chromium {
            return Err(VitrinaError::EngineLaunch {
                message: format!(
                    "the CDP engine drives chromium only; '{}' was requested",
                    config.browser.as_str()
                ),
            });
        }

        let mut builder = CdpConfig::builder()
            .window_size(config.viewport.width, config.viewport.height);
        if !config.headless {
            builder = builder.with_head();
        }
        // Container CI runners generally lack the user namespaces the
        // sandbox needs.
        if cfg!(target_os = "linux") {
            builder = builder.no_sandbox();
        }
        let cdp_config = builder.build().map_err(|e| VitrinaError::EngineLaunch {
            message: e.to_string(),
        })?;

        let (browser, mut handler) =
            CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| VitrinaError::EngineLaunch {
                    message: e.to_string(),
                })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        debug!(headless = config.headless, "chromium launched");
        Ok(Self {
            browser: Arc::new(Mutex::new(browser)),
            handler,
        })
    }
}

#[async_trait]
impl Engine for ChromiumEngine {
    async fn new_session(&self, config: &RunConfiguration) -> VitrinaResult<Box<dyn Automation>> {
        let browser = self.browser.lock().await;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| VitrinaError::Session {
                message: e.to_string(),
            })?;
        Ok(Box::new(CdpAutomation {
            page: Arc::new(Mutex::new(page)),
            action_timeout: Mutex::new(config.default_timeout),
            trace: Mutex::new(TraceLog::default()),
        }))
    }

    async fn close(&self) -> VitrinaResult<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(|e| VitrinaError::Session {
            message: e.to_string(),
        })?;
        Ok(())
    }
}

#[derive(Debug, Serialize, Clone)]
struct TraceEvent {
    at_ms: u128,
    action: String,
}

#[derive(Default)]
struct TraceLog {
    active: bool,
    started: Option<Instant>,
    events: Vec<TraceEvent>,
}

/// One Chromium page behind the automation capability
pub struct CdpAutomation {
    page: Arc<Mutex<CdpPage>>,
    action_timeout: Mutex<Duration>,
    trace: Mutex<TraceLog>,
}

impl std::fmt::Debug for CdpAutomation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdpAutomation").finish_non_exhaustive()
    }
}

/// JavaScript expression resolving a query to an array of elements
fn resolve_js(query: &ElementQuery) -> String {
    // serde_json escaping keeps quotes in selectors and filters safe
    let selector = serde_json::to_string(query.selector()).unwrap_or_default();
    let mut js = format!("let els = Array.from(document.querySelectorAll({selector}));");
    if let Some(text) = query.text_filter() {
        let needle = serde_json::to_string(&text.to_lowercase()).unwrap_or_default();
        js.push_str(&format!(
            "els = els.filter(e => (e.textContent || '').toLowerCase().includes({needle}));"
        ));
    }
    match query.refinement() {
        Refinement::None => {}
        Refinement::First => js.push_str("els = els.slice(0, 1);"),
        Refinement::Nth(n) => js.push_str(&format!("els = els.slice({n}, {n} + 1);")),
    }
    js
}

fn visible_js() -> &'static str {
    "const visible = e => !!(e.offsetWidth || e.offsetHeight || e.getClientRects().length);"
}

/// PNG capture of the whole page; a plain capture stops at the viewport
/// and would cut failure evidence below the fold
fn full_page_screenshot_params() -> CaptureScreenshotParams {
    CaptureScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .capture_beyond_viewport(true)
        .build()
}

impl CdpAutomation {
    async fn eval<T: serde::de::DeserializeOwned>(
        &self,
        query: &ElementQuery,
        expr: &str,
    ) -> VitrinaResult<T> {
        let page = self.page.lock().await;
        let result =
            page.evaluate(expr)
                .await
                .map_err(|e| VitrinaError::Interaction {
                    selector: query.describe(),
                    message: e.to_string(),
                })?;
        result.into_value().map_err(|e| VitrinaError::Interaction {
            selector: query.describe(),
            message: format!("unexpected evaluation result: {e}"),
        })
    }

    /// Run `body` (which receives `els` and `visible`) against the first
    /// resolved element, retrying until the action timeout elapses. DOM
    /// mutation between samples makes a single-shot lookup too fragile.
    async fn with_element(&self, query: &ElementQuery, body: &str) -> VitrinaResult<()> {
        let expr = format!(
            "(() => {{ {resolve} {visible} if (els.length === 0) return false; \
             const el = els[0]; {body} return true; }})()",
            resolve = resolve_js(query),
            visible = visible_js(),
        );
        let timeout = *self.action_timeout.lock().await;
        let start = Instant::now();
        loop {
            if self.eval::<bool>(query, &expr).await? {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(VitrinaError::Interaction {
                    selector: query.describe(),
                    message: format!("no matching element within {}ms", timeout.as_millis()),
                });
            }
            sleep(DOM_POLL).await;
        }
    }

    async fn record(&self, action: String) {
        let mut trace = self.trace.lock().await;
        if trace.active {
            let at_ms = trace
                .started
                .map_or(0, |started| started.elapsed().as_millis());
            trace.events.push(TraceEvent { at_ms, action });
        }
    }
}

#[async_trait]
impl Automation for CdpAutomation {
    async fn navigate(
        &self,
        url: &str,
        condition: LoadCondition,
        timeout: Duration,
    ) -> VitrinaResult<()> {
        self.record(format!("navigate {url}")).await;
        let start = Instant::now();
        {
            let page = self.page.lock().await;
            tokio::time::timeout(timeout, page.goto(url))
                .await
                .map_err(|_| VitrinaError::timeout(format!("navigation to {url}"), timeout))?
                .map_err(|e| VitrinaError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
        }

        // goto resolves on the main frame response; document readiness is
        // polled separately so the load condition actually means something.
        let wanted = match condition {
            LoadCondition::DomContentLoaded => "['interactive','complete']",
            LoadCondition::Load => "['complete']",
        };
        let expr = format!("{wanted}.includes(document.readyState)");
        loop {
            let ready = {
                let page = self.page.lock().await;
                page.evaluate(expr.as_str())
                    .await
                    .ok()
                    .and_then(|r| r.into_value::<bool>().ok())
                    .unwrap_or(false)
            };
            if ready {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(VitrinaError::timeout(format!("document ready at {url}"), timeout));
            }
            sleep(DOM_POLL).await;
        }
    }

    async fn wait_for(
        &self,
        query: &ElementQuery,
        state: WaitState,
        timeout: Duration,
    ) -> VitrinaResult<()> {
        let check = format!(
            "(() => {{ {resolve} {visible} return els.some(visible); }})()",
            resolve = resolve_js(query),
            visible = visible_js(),
        );
        let start = Instant::now();
        loop {
            let any_visible: bool = self.eval(query, &check).await?;
            let met = match state {
                WaitState::Visible => any_visible,
                WaitState::Hidden => !any_visible,
            };
            if met {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                let what = match state {
                    WaitState::Visible => format!("visible: {}", query.describe()),
                    WaitState::Hidden => format!("hidden: {}", query.describe()),
                };
                return Err(VitrinaError::timeout(what, timeout));
            }
            sleep(DOM_POLL).await;
        }
    }

    async fn click(&self, query: &ElementQuery) -> VitrinaResult<()> {
        self.record(format!("click {}", query.describe())).await;
        self.with_element(query, "el.scrollIntoView({block: 'center'}); el.click();")
            .await
    }

    async fn fill(&self, query: &ElementQuery, value: &str) -> VitrinaResult<()> {
        self.record(format!("fill {} = {value}", query.describe())).await;
        let value = serde_json::to_string(value).unwrap_or_default();
        let body = format!(
            "el.focus(); el.value = {value}; \
             el.dispatchEvent(new Event('input', {{bubbles: true}})); \
             el.dispatchEvent(new Event('change', {{bubbles: true}}));"
        );
        self.with_element(query, &body).await
    }

    async fn check(&self, query: &ElementQuery) -> VitrinaResult<()> {
        self.record(format!("check {}", query.describe())).await;
        self.with_element(
            query,
            "if (!el.checked) { el.click(); } \
             if (!el.checked) { el.checked = true; \
             el.dispatchEvent(new Event('change', {bubbles: true})); }",
        )
        .await
    }

    async fn uncheck(&self, query: &ElementQuery) -> VitrinaResult<()> {
        self.record(format!("uncheck {}", query.describe())).await;
        self.with_element(
            query,
            "if (el.checked) { el.click(); } \
             if (el.checked) { el.checked = false; \
             el.dispatchEvent(new Event('change', {bubbles: true})); }",
        )
        .await
    }

    async fn is_checked(&self, query: &ElementQuery) -> VitrinaResult<bool> {
        let expr = format!(
            "(() => {{ {resolve} return els.length > 0 && !!els[0].checked; }})()",
            resolve = resolve_js(query),
        );
        self.eval(query, &expr).await
    }

    async fn select_by_label(&self, query: &ElementQuery, label: &str) -> VitrinaResult<()> {
        self.record(format!("select {} = {label}", query.describe())).await;
        let label = serde_json::to_string(label).unwrap_or_default();
        let body = format!(
            "const option = Array.from(el.options).find(o => o.label.trim() === {label}.trim() \
             || o.textContent.trim() === {label}.trim()); \
             if (!option) return false; \
             el.value = option.value; \
             el.dispatchEvent(new Event('change', {{bubbles: true}}));"
        );
        self.with_element(query, &body).await
    }

    async fn press(&self, query: &ElementQuery, key: &str) -> VitrinaResult<()> {
        self.record(format!("press {} {key}", query.describe())).await;
        let key_json = serde_json::to_string(key).unwrap_or_default();
        // Synthetic key events are untrusted; for Enter the closest form is
        // submitted explicitly, which is what the storefront reacts to.
        let mut body = format!(
            "for (const type of ['keydown', 'keypress', 'keyup']) {{ \
             el.dispatchEvent(new KeyboardEvent(type, {{key: {key_json}, bubbles: true}})); }}"
        );
        if key == "Enter" {
            body.push_str(
                "const form = el.closest('form'); \
                 if (form) { form.requestSubmit ? form.requestSubmit() : form.submit(); }",
            );
        }
        self.with_element(query, &body).await
    }

    async fn inner_text(&self, query: &ElementQuery) -> VitrinaResult<String> {
        let expr = format!(
            "(() => {{ {resolve} return els.length > 0 ? els[0].innerText : null; }})()",
            resolve = resolve_js(query),
        );
        let text: Option<String> = self.eval(query, &expr).await?;
        text.ok_or_else(|| VitrinaError::Interaction {
            selector: query.describe(),
            message: "no matching element".to_string(),
        })
    }

    async fn input_value(&self, query: &ElementQuery) -> VitrinaResult<String> {
        let expr = format!(
            "(() => {{ {resolve} return els.length > 0 ? String(els[0].value) : null; }})()",
            resolve = resolve_js(query),
        );
        let value: Option<String> = self.eval(query, &expr).await?;
        value.ok_or_else(|| VitrinaError::Interaction {
            selector: query.describe(),
            message: "no matching element".to_string(),
        })
    }

    async fn count(&self, query: &ElementQuery) -> VitrinaResult<usize> {
        let expr = format!(
            "(() => {{ {resolve} return els.length; }})()",
            resolve = resolve_js(query),
        );
        self.eval(query, &expr).await
    }

    async fn screenshot(&self) -> VitrinaResult<Vec<u8>> {
        self.record("screenshot".to_string()).await;
        let page = self.page.lock().await;
        let shot = page
            .execute(full_page_screenshot_params())
            .await
            .map_err(|e| VitrinaError::Screenshot {
                message: e.to_string(),
            })?;
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD
            .decode(&shot.data)
            .map_err(|e| VitrinaError::Screenshot {
                message: format!("invalid screenshot payload: {e}"),
            })
    }

    async fn apply_timeouts(&self, action: Duration, _navigation: Duration) -> VitrinaResult<()> {
        *self.action_timeout.lock().await = action;
        Ok(())
    }

    async fn trace_start(&self) -> VitrinaResult<()> {
        let mut trace = self.trace.lock().await;
        trace.active = true;
        trace.started = Some(Instant::now());
        trace.events.clear();
        Ok(())
    }

    async fn trace_stop(&self, persist_to: Option<&Path>) -> VitrinaResult<()> {
        let events = {
            let mut trace = self.trace.lock().await;
            trace.active = false;
            std::mem::take(&mut trace.events)
        };
        if let Some(path) = persist_to {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let payload =
                serde_json::to_vec_pretty(&events).map_err(|e| VitrinaError::Trace {
                    message: e.to_string(),
                })?;
            std::fs::write(path, payload).map_err(|e| VitrinaError::Trace {
                message: format!("{}: {e}", path.display()),
            })?;
            debug!(path = %path.display(), events = events.len(), "trace persisted");
        }
        Ok(())
    }

    async fn close(&self) -> VitrinaResult<()> {
        // Page handles are shallow clones over one CDP target; close
        // consumes the handle, not the lock.
        let page = self.page.lock().await.clone();
        page.close().await.map_err(|e| VitrinaError::Session {
            message: e.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolver_escapes_selectors_and_filters() {
        let q = ElementQuery::css("input[name='product_attribute_5']")
            .with_text("320 \"GB\"")
            .nth(2);
        let js = resolve_js(&q);
        assert!(js.contains(r"input[name='product_attribute_5']"));
        assert!(js.contains(r#"320 \"gb\""#));
        assert!(js.contains("slice(2, 2 + 1)"));
    }

    #[test]
    fn screenshots_capture_beyond_the_viewport() {
        let params = full_page_screenshot_params();
        assert_eq!(params.capture_beyond_viewport, Some(true));
        assert!(matches!(params.format, Some(CaptureScreenshotFormat::Png)));
    }

    #[tokio::test]
    async fn non_chromium_kinds_are_rejected_at_launch() {
        let config = RunConfiguration {
            browser: BrowserKind::Firefox,
            ..RunConfiguration::default()
        };
        let err = ChromiumEngine::launch(&config).await.unwrap_err();
        match err {
            VitrinaError::EngineLaunch { message } => {
                assert!(message.contains("firefox"));
            }
            other => panic!("expected EngineLaunch, got {other}"),
        }
    }
}
