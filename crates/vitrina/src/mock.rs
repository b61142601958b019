//! Scripted test doubles for the automation capability.
//!
//! `ScriptedAutomation` lets unit tests script page behavior per selector:
//! which elements are visible, what clicking reveals or hides, and the
//! sequence of texts an element reports across successive samples. Call
//! history is recorded for verification. `ScriptedEngine` counts launches
//! and sessions for the lifecycle tests.

use crate::capability::{Automation, LoadCondition, WaitState};
use crate::config::RunConfiguration;
use crate::locator::ElementQuery;
use crate::result::{VitrinaError, VitrinaResult};
use crate::session::Engine;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Polling interval for scripted waits (kept small; the paused tokio clock
/// auto-advances through it)
const SCRIPT_POLL: Duration = Duration::from_millis(25);

#[derive(Default)]
struct ScriptState {
    visible: HashSet<String>,
    reveal_on_click: HashMap<String, Vec<String>>,
    hide_on_click: HashMap<String, Vec<String>>,
    texts: HashMap<String, VecDeque<String>>,
    input_values: HashMap<String, String>,
    checked: HashSet<String>,
    counts: HashMap<String, usize>,
    calls: Vec<String>,
    screenshot_png: Vec<u8>,
    fail_screenshot: bool,
    fail_trace_persist: bool,
    tracing: bool,
    trace_events: Vec<String>,
    closed: bool,
}

/// Scripted implementation of the automation capability.
///
/// Clones share state, so a test can keep a handle to a session's
/// automation after the session itself has been consumed.
#[derive(Default, Clone)]
pub struct ScriptedAutomation {
    state: Arc<Mutex<ScriptState>>,
}

impl std::fmt::Debug for ScriptedAutomation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedAutomation").finish_non_exhaustive()
    }
}

impl ScriptedAutomation {
    /// Create an empty script: nothing visible, no texts
    #[must_use]
    pub fn new() -> Self {
        let automation = Self::default();
        // A four-byte stand-in for PNG output; the fixture only persists bytes.
        automation.state.lock().unwrap().screenshot_png = vec![0x89, 0x50, 0x4E, 0x47];
        automation
    }

    /// Mark a selector as currently visible
    pub fn set_visible(&self, selector: &str) {
        let _ = self.state.lock().unwrap().visible.insert(selector.to_string());
    }

    /// Mark a selector as hidden
    pub fn set_hidden(&self, selector: &str) {
        let _ = self.state.lock().unwrap().visible.remove(selector);
    }

    /// Clicking `clicked` makes `revealed` visible
    pub fn reveal_on_click(&self, clicked: &str, revealed: &str) {
        self.state
            .lock()
            .unwrap()
            .reveal_on_click
            .entry(clicked.to_string())
            .or_default()
            .push(revealed.to_string());
    }

    /// Clicking `clicked` hides `hidden`
    pub fn hide_on_click(&self, clicked: &str, hidden: &str) {
        self.state
            .lock()
            .unwrap()
            .hide_on_click
            .entry(clicked.to_string())
            .or_default()
            .push(hidden.to_string());
    }

    /// Script the successive texts a selector reports; the final entry
    /// repeats forever
    pub fn set_text_sequence(&self, selector: &str, samples: &[&str]) {
        let _ = self.state.lock().unwrap().texts.insert(
            selector.to_string(),
            samples.iter().map(|s| (*s).to_string()).collect(),
        );
    }

    /// Script an input's current value
    pub fn set_input_value(&self, selector: &str, value: &str) {
        let _ = self
            .state
            .lock()
            .unwrap()
            .input_values
            .insert(selector.to_string(), value.to_string());
    }

    /// Script a match count for a selector
    pub fn set_count(&self, selector: &str, count: usize) {
        let _ = self.state.lock().unwrap().counts.insert(selector.to_string(), count);
    }

    /// Make screenshot capture fail (for never-mask-the-outcome tests)
    pub fn fail_screenshots(&self) {
        self.state.lock().unwrap().fail_screenshot = true;
    }

    /// Make persisting trace stops fail
    pub fn fail_trace_persist(&self) {
        self.state.lock().unwrap().fail_trace_persist = true;
    }

    /// Recorded call history, oldest first
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// How many recorded calls start with `prefix`
    #[must_use]
    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Whether `close` has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn record(&self, call: String) {
        let mut state = self.state.lock().unwrap();
        if state.tracing {
            state.trace_events.push(call.clone());
        }
        state.calls.push(call);
    }
}

#[async_trait]
impl Automation for ScriptedAutomation {
    async fn navigate(
        &self,
        url: &str,
        _condition: LoadCondition,
        _timeout: Duration,
    ) -> VitrinaResult<()> {
        self.record(format!("navigate:{url}"));
        Ok(())
    }

    async fn wait_for(
        &self,
        query: &ElementQuery,
        state: WaitState,
        timeout: Duration,
    ) -> VitrinaResult<()> {
        let start = Instant::now();
        loop {
            let met = {
                let guard = self.state.lock().unwrap();
                let visible = guard.visible.contains(query.selector());
                match state {
                    WaitState::Visible => visible,
                    WaitState::Hidden => !visible,
                }
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
            sleep(SCRIPT_POLL).await;
        }
    }

    async fn click(&self, query: &ElementQuery) -> VitrinaResult<()> {
        self.record(format!("click:{}", query.selector()));
        let mut state = self.state.lock().unwrap();
        if let Some(revealed) = state.reveal_on_click.get(query.selector()).cloned() {
            for selector in revealed {
                let _ = state.visible.insert(selector);
            }
        }
        if let Some(hidden) = state.hide_on_click.get(query.selector()).cloned() {
            for selector in hidden {
                let _ = state.visible.remove(&selector);
            }
        }
        Ok(())
    }

    async fn fill(&self, query: &ElementQuery, value: &str) -> VitrinaResult<()> {
        self.record(format!("fill:{}={value}", query.selector()));
        let selector = query.selector().to_string();
        let _ = self
            .state
            .lock()
            .unwrap()
            .input_values
            .insert(selector, value.to_string());
        Ok(())
    }

    async fn check(&self, query: &ElementQuery) -> VitrinaResult<()> {
        self.record(format!("check:{}", query.describe()));
        let _ = self
            .state
            .lock()
            .unwrap()
            .checked
            .insert(query.describe());
        Ok(())
    }

    async fn uncheck(&self, query: &ElementQuery) -> VitrinaResult<()> {
        self.record(format!("uncheck:{}", query.describe()));
        let _ = self.state.lock().unwrap().checked.remove(&query.describe());
        Ok(())
    }

    async fn is_checked(&self, query: &ElementQuery) -> VitrinaResult<bool> {
        Ok(self.state.lock().unwrap().checked.contains(&query.describe()))
    }

    async fn select_by_label(&self, query: &ElementQuery, label: &str) -> VitrinaResult<()> {
        self.record(format!("select:{}={label}", query.selector()));
        Ok(())
    }

    async fn press(&self, query: &ElementQuery, key: &str) -> VitrinaResult<()> {
        self.record(format!("press:{}:{key}", query.selector()));
        Ok(())
    }

    async fn inner_text(&self, query: &ElementQuery) -> VitrinaResult<String> {
        let mut state = self.state.lock().unwrap();
        let samples = state.texts.get_mut(query.selector()).ok_or_else(|| {
            VitrinaError::Interaction {
                selector: query.selector().to_string(),
                message: "no scripted text".to_string(),
            }
        })?;
        let text = if samples.len() > 1 {
            samples.pop_front().unwrap_or_default()
        } else {
            samples.front().cloned().unwrap_or_default()
        };
        Ok(text)
    }

    async fn input_value(&self, query: &ElementQuery) -> VitrinaResult<String> {
        self.state
            .lock()
            .unwrap()
            .input_values
            .get(query.selector())
            .cloned()
            .ok_or_else(|| VitrinaError::Interaction {
                selector: query.selector().to_string(),
                message: "no scripted input value".to_string(),
            })
    }

    async fn count(&self, query: &ElementQuery) -> VitrinaResult<usize> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .counts
            .get(query.selector())
            .copied()
            .unwrap_or(0))
    }

    async fn screenshot(&self) -> VitrinaResult<Vec<u8>> {
        self.record("screenshot".to_string());
        let state = self.state.lock().unwrap();
        if state.fail_screenshot {
            return Err(VitrinaError::Screenshot {
                message: "scripted screenshot failure".to_string(),
            });
        }
        Ok(state.screenshot_png.clone())
    }

    async fn apply_timeouts(&self, action: Duration, navigation: Duration) -> VitrinaResult<()> {
        self.record(format!(
            "apply_timeouts:{}ms/{}ms",
            action.as_millis(),
            navigation.as_millis()
        ));
        Ok(())
    }

    async fn trace_start(&self) -> VitrinaResult<()> {
        self.record("trace_start".to_string());
        self.state.lock().unwrap().tracing = true;
        Ok(())
    }

    async fn trace_stop(&self, persist_to: Option<&Path>) -> VitrinaResult<()> {
        let (events, fail) = {
            let mut state = self.state.lock().unwrap();
            state.tracing = false;
            (state.trace_events.clone(), state.fail_trace_persist)
        };
        self.record(format!("trace_stop:persist={}", persist_to.is_some()));
        if let Some(path) = persist_to {
            if fail {
                return Err(VitrinaError::Trace {
                    message: "scripted trace persist failure".to_string(),
                });
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_vec(&events)?)?;
        }
        Ok(())
    }

    async fn close(&self) -> VitrinaResult<()> {
        self.record("close".to_string());
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Factory applied to every scripted session before it is handed out
pub type SessionScript = dyn Fn(&ScriptedAutomation) + Send + Sync;

/// Scripted engine for session-lifecycle tests.
///
/// Launch and session counts are shared through `Arc` so tests can assert
/// on them after the context has consumed the engine.
pub struct ScriptedEngine {
    launches: Arc<AtomicUsize>,
    sessions: Arc<AtomicUsize>,
    script: Option<Box<SessionScript>>,
}

impl std::fmt::Debug for ScriptedEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedEngine")
            .field("launches", &self.launches.load(Ordering::SeqCst))
            .field("sessions", &self.sessions.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl ScriptedEngine {
    /// "Launch" a scripted engine, incrementing the shared launch counter
    #[must_use]
    pub fn launch(launches: Arc<AtomicUsize>, sessions: Arc<AtomicUsize>) -> Self {
        let _ = launches.fetch_add(1, Ordering::SeqCst);
        Self {
            launches,
            sessions,
            script: None,
        }
    }

    /// Apply a script to each session this engine produces (e.g. make the
    /// readiness selectors visible so sessions open cleanly)
    #[must_use]
    pub fn with_session_script(
        mut self,
        script: impl Fn(&ScriptedAutomation) + Send + Sync + 'static,
    ) -> Self {
        self.script = Some(Box::new(script));
        self
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    async fn new_session(&self, _config: &RunConfiguration) -> VitrinaResult<Box<dyn Automation>> {
        let _ = self.sessions.fetch_add(1, Ordering::SeqCst);
        let automation = ScriptedAutomation::new();
        if let Some(script) = &self.script {
            script(&automation);
        }
        Ok(Box::new(automation))
    }

    async fn close(&self) -> VitrinaResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_automation_records_calls() {
        let automation = ScriptedAutomation::new();
        automation
            .navigate("https://demo.nopcommerce.com", LoadCondition::default(), Duration::ZERO)
            .await
            .unwrap();
        automation
            .fill(&ElementQuery::css("#Email"), "a@b.c")
            .await
            .unwrap();
        assert_eq!(automation.calls_matching("navigate:"), 1);
        assert!(automation.calls().iter().any(|c| c == "fill:#Email=a@b.c"));
    }

    #[tokio::test]
    async fn text_sequence_repeats_final_sample() {
        let automation = ScriptedAutomation::new();
        automation.set_text_sequence("span.price-value-1", &["$1,100.00", "$1,250.00"]);
        let q = ElementQuery::css("span.price-value-1");
        assert_eq!(automation.inner_text(&q).await.unwrap(), "$1,100.00");
        assert_eq!(automation.inner_text(&q).await.unwrap(), "$1,250.00");
        assert_eq!(automation.inner_text(&q).await.unwrap(), "$1,250.00");
    }

    #[tokio::test(start_paused = true)]
    async fn click_side_effects_change_visibility() {
        let automation = ScriptedAutomation::new();
        automation.set_visible(".menu-toggle");
        automation.reveal_on_click(".menu-toggle", "a.ico-register");

        let register = ElementQuery::css("a.ico-register");
        assert!(automation
            .wait_for(&register, WaitState::Visible, Duration::ZERO)
            .await
            .is_err());
        automation.click(&ElementQuery::css(".menu-toggle")).await.unwrap();
        assert!(automation
            .wait_for(&register, WaitState::Visible, Duration::ZERO)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn scripted_engine_counts_launches_and_sessions() {
        let launches = Arc::new(AtomicUsize::new(0));
        let sessions = Arc::new(AtomicUsize::new(0));
        let engine = ScriptedEngine::launch(Arc::clone(&launches), Arc::clone(&sessions));
        let config = RunConfiguration::default();
        let _one = engine.new_session(&config).await.unwrap();
        let _two = engine.new_session(&config).await.unwrap();
        assert_eq!(launches.load(Ordering::SeqCst), 1);
        assert_eq!(sessions.load(Ordering::SeqCst), 2);
    }
}
