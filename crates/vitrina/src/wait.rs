//! Shared wait primitives.
//!
//! Two patterns recur across the harness: a bounded probe that treats
//! absence as a normal branch, and a race where the first of several
//! independently-specified conditions to hold wins a shared timeout (the
//! add-to-cart toast-vs-badge race, the cart table-vs-empty-message race,
//! the readiness anchor-vs-cookie-banner race). Both live here instead of
//! being re-rolled per page model.

use crate::capability::{Automation, WaitState};
use crate::locator::ElementQuery;
use crate::result::{VitrinaError, VitrinaResult};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Default polling interval for condition races (50ms)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One condition in a first-of-N race
#[derive(Debug, Clone)]
pub enum WaitGoal {
    /// The queried element is visible
    Visible(ElementQuery),
    /// The queried element is absent or hidden
    Hidden(ElementQuery),
    /// The queried element's text differs from a baseline sample
    TextChanged {
        /// Element whose text is sampled
        query: ElementQuery,
        /// Text observed before the triggering action
        baseline: String,
    },
}

impl WaitGoal {
    fn describe(&self) -> String {
        match self {
            Self::Visible(q) => format!("visible: {}", q.describe()),
            Self::Hidden(q) => format!("hidden: {}", q.describe()),
            Self::TextChanged { query, .. } => format!("text change: {}", query.describe()),
        }
    }

    async fn is_met(&self, automation: &dyn Automation) -> bool {
        match self {
            // Zero-timeout waits: a single instantaneous check, the outer
            // loop provides the polling.
            Self::Visible(q) => automation
                .wait_for(q, WaitState::Visible, Duration::ZERO)
                .await
                .is_ok(),
            Self::Hidden(q) => automation
                .wait_for(q, WaitState::Hidden, Duration::ZERO)
                .await
                .is_ok(),
            Self::TextChanged { query, baseline } => automation
                .inner_text(query)
                .await
                .map(|t| t.trim() != baseline.trim())
                .unwrap_or(false),
        }
    }
}

/// Wait until the first of `goals` holds, under one shared timeout.
///
/// Returns the index of the winning goal. Goals are checked in order on
/// each tick, so on simultaneous satisfaction the lower index wins; callers
/// must not read meaning into that beyond tie-breaking.
pub async fn first_of(
    automation: &dyn Automation,
    goals: &[WaitGoal],
    timeout: Duration,
    poll: Duration,
) -> VitrinaResult<usize> {
    let start = Instant::now();
    loop {
        for (idx, goal) in goals.iter().enumerate() {
            if goal.is_met(automation).await {
                return Ok(idx);
            }
        }
        if start.elapsed() >= timeout {
            let described: Vec<String> = goals.iter().map(WaitGoal::describe).collect();
            return Err(VitrinaError::timeout(
                format!("first of [{}]", described.join(" | ")),
                timeout,
            ));
        }
        sleep(poll).await;
    }
}

/// Bounded visibility probe that never errors.
///
/// Optional overlays (cookie banners, promo bars, mobile menu toggles) are
/// probed with this; their absence is an expected branch, not a failure.
pub async fn quickly_visible(
    automation: &dyn Automation,
    query: &ElementQuery,
    timeout: Duration,
) -> bool {
    automation
        .wait_for(query, WaitState::Visible, timeout)
        .await
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedAutomation;

    #[tokio::test(start_paused = true)]
    async fn first_of_returns_index_of_satisfied_goal() {
        let automation = ScriptedAutomation::new();
        automation.set_visible("#bar-notification.success");

        let goals = vec![
            WaitGoal::Visible(ElementQuery::css("span.cart-qty")),
            WaitGoal::Visible(ElementQuery::css("#bar-notification.success")),
        ];
        let winner = first_of(
            &automation,
            &goals,
            Duration::from_secs(8),
            DEFAULT_POLL_INTERVAL,
        )
        .await
        .unwrap();
        assert_eq!(winner, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn first_of_detects_text_change() {
        let automation = ScriptedAutomation::new();
        automation.set_text_sequence("span.cart-qty", &["(0)", "(0)", "(1)"]);

        let goals = vec![
            WaitGoal::Visible(ElementQuery::css("#bar-notification.success")),
            WaitGoal::TextChanged {
                query: ElementQuery::css("span.cart-qty"),
                baseline: "(0)".to_string(),
            },
        ];
        let winner = first_of(
            &automation,
            &goals,
            Duration::from_secs(8),
            DEFAULT_POLL_INTERVAL,
        )
        .await
        .unwrap();
        assert_eq!(winner, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn first_of_times_out_with_described_goals() {
        let automation = ScriptedAutomation::new();
        let goals = vec![WaitGoal::Visible(ElementQuery::css(".never-there"))];
        let err = first_of(
            &automation,
            &goals,
            Duration::from_millis(400),
            DEFAULT_POLL_INTERVAL,
        )
        .await
        .unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains(".never-there"));
    }

    #[tokio::test(start_paused = true)]
    async fn quickly_visible_swallows_timeout() {
        let automation = ScriptedAutomation::new();
        let q = ElementQuery::css("#eu-cookie-ok");
        assert!(!quickly_visible(&automation, &q, Duration::from_millis(800)).await);

        automation.set_visible("#eu-cookie-ok");
        assert!(quickly_visible(&automation, &q, Duration::from_millis(800)).await);
    }
}
