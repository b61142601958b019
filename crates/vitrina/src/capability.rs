//! The automation capability: the seam between the harness and the
//! browser engine.
//!
//! Everything the readiness prober, the price poller, the session manager
//! and the page models need from a browser goes through [`Automation`].
//! The CDP-backed implementation lives in `cdp` (behind the `browser`
//! feature); unit tests script the seam via `mock::ScriptedAutomation`.

use crate::locator::ElementQuery;
use crate::result::VitrinaResult;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Load condition for navigation.
///
/// The harness navigates with `DomContentLoaded` rather than network-idle:
/// real storefronts keep long-lived connections open and never go idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadCondition {
    /// The document has been parsed (`DOMContentLoaded`)
    #[default]
    DomContentLoaded,
    /// The `load` event has fired
    Load,
}

/// Target state for element waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    /// Element is attached and visible
    Visible,
    /// Element is absent or hidden
    Hidden,
}

/// Abstract browser automation capability.
///
/// Operations look synchronous but suspend until the browser responds or the
/// given timeout elapses; a timeout is the sole cancellation mechanism.
/// Callers decide per call whether a timeout is a normal branch (optional
/// probes) or a failure (mandatory waits).
#[async_trait]
pub trait Automation: Send + Sync {
    /// Navigate to a URL and wait for the load condition
    async fn navigate(
        &self,
        url: &str,
        condition: LoadCondition,
        timeout: Duration,
    ) -> VitrinaResult<()>;

    /// Wait until the queried element reaches `state`
    async fn wait_for(
        &self,
        query: &ElementQuery,
        state: WaitState,
        timeout: Duration,
    ) -> VitrinaResult<()>;

    /// Click the queried element
    async fn click(&self, query: &ElementQuery) -> VitrinaResult<()>;

    /// Replace the value of the queried input
    async fn fill(&self, query: &ElementQuery, value: &str) -> VitrinaResult<()>;

    /// Check the queried radio button or checkbox
    async fn check(&self, query: &ElementQuery) -> VitrinaResult<()>;

    /// Uncheck the queried checkbox
    async fn uncheck(&self, query: &ElementQuery) -> VitrinaResult<()>;

    /// Whether the queried checkbox/radio is currently checked
    async fn is_checked(&self, query: &ElementQuery) -> VitrinaResult<bool>;

    /// Select the `<option>` with the given visible label
    async fn select_by_label(&self, query: &ElementQuery, label: &str) -> VitrinaResult<()>;

    /// Press a key while the queried element is focused (e.g. "Enter")
    async fn press(&self, query: &ElementQuery, key: &str) -> VitrinaResult<()>;

    /// Text content of the queried element, trimmed
    async fn inner_text(&self, query: &ElementQuery) -> VitrinaResult<String>;

    /// Current value of the queried input
    async fn input_value(&self, query: &ElementQuery) -> VitrinaResult<String>;

    /// Number of elements matching the query
    async fn count(&self, query: &ElementQuery) -> VitrinaResult<usize>;

    /// Full-page screenshot as PNG bytes
    async fn screenshot(&self) -> VitrinaResult<Vec<u8>>;

    /// Apply default action and navigation timeouts for the session
    async fn apply_timeouts(&self, action: Duration, navigation: Duration) -> VitrinaResult<()>;

    /// Begin recording a session trace (screenshots, snapshots, sources)
    async fn trace_start(&self) -> VitrinaResult<()>;

    /// Stop tracing. `persist_to: Some(path)` writes the trace there;
    /// `None` discards the buffer.
    async fn trace_stop(&self, persist_to: Option<&Path>) -> VitrinaResult<()>;

    /// Close the session context, releasing all session-scoped resources
    async fn close(&self) -> VitrinaResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_condition_defaults_to_dom_parsed() {
        assert_eq!(LoadCondition::default(), LoadCondition::DomContentLoaded);
    }

    #[test]
    fn wait_states_are_distinct() {
        assert_ne!(WaitState::Visible, WaitState::Hidden);
    }
}
