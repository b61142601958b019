//! Page readiness probing.
//!
//! A freshly navigated storefront page is not safe to interact with until
//! variable network timing, locale-dependent overlays (cookie consent,
//! promo bars) and responsive-layout differences have been dealt with.
//! Every intermediate probe here treats "not found" as a normal branch;
//! only the final navigation-affordance check is a hard requirement, and
//! its failure surfaces as [`VitrinaError::NotReady`] so it cannot be
//! mistaken for a business assertion failure downstream.

use crate::capability::{Automation, LoadCondition, WaitState};
use crate::locator::ElementQuery;
use crate::result::{VitrinaError, VitrinaResult};
use crate::wait::{first_of, quickly_visible, WaitGoal, DEFAULT_POLL_INTERVAL};
use std::time::Duration;
use tracing::debug;

/// Stable anchor that proves the header rendered (logo link or cart icon)
pub const READY_ANCHOR: &str = ".header-logo a, a.ico-cart";

/// Cookie-consent accept controls seen across demo locales
pub const COOKIE_CONSENT: &str = "#eu-cookie-ok, .cookie-bar button";

/// Text of consent buttons that carry no stable id or class
pub const COOKIE_CONSENT_TEXT: &str = "I agree";

/// Transient notification/promo bar
pub const NOTIFICATION_BAR: &str = "#bar-notification";

/// Close control inside the notification bar
pub const NOTIFICATION_CLOSE: &str = "#bar-notification .close, #bar-notification .close-notification";

/// Primary navigation affordance: the register link in the header
pub const REGISTER_AFFORDANCE: &str = "a.ico-register, .header-links a[href*='register']";

/// Menu toggle shown on narrow/mobile layouts
pub const MENU_TOGGLE: &str = ".menu-toggle, .mobile-menu-toggle, .responsive-nav-button";

/// Tunable probe timeouts.
///
/// Observed values diverge across revisions of the suite this encodes;
/// none of them is a load-bearing contract, so they are all fields here.
#[derive(Debug, Clone)]
pub struct ReadinessTimeouts {
    /// Short probe for optional overlays
    pub probe: Duration,
    /// Wait for a dismissed overlay to actually disappear
    pub settle: Duration,
    /// Wait for the affordance to appear after opening the mobile menu
    pub menu_reveal: Duration,
    /// The one mandatory wait: the final affordance check
    pub final_check: Duration,
}

impl Default for ReadinessTimeouts {
    fn default() -> Self {
        Self {
            probe: Duration::from_millis(1000),
            settle: Duration::from_millis(5000),
            menu_reveal: Duration::from_millis(5000),
            final_check: Duration::from_secs(60),
        }
    }
}

/// Decides when a navigated page is interactable
#[derive(Debug, Clone, Default)]
pub struct ReadinessProber {
    timeouts: ReadinessTimeouts,
}

impl ReadinessProber {
    /// Prober with default timeouts
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prober with custom timeouts
    #[must_use]
    pub fn with_timeouts(timeouts: ReadinessTimeouts) -> Self {
        Self { timeouts }
    }

    /// Override the final-check timeout (the fixture sets it to the
    /// session's navigation timeout)
    #[must_use]
    pub fn with_final_check(mut self, timeout: Duration) -> Self {
        self.timeouts.final_check = timeout;
        self
    }

    /// Navigate to `url` and bring the page to an interactable state.
    ///
    /// Runs the full sequence: document-parsed navigation, anchor/cookie
    /// race, banner dismissal, mobile-menu fallback, final affordance check.
    pub async fn ensure_ready(
        &self,
        automation: &dyn Automation,
        url: &str,
        navigation_timeout: Duration,
    ) -> VitrinaResult<()> {
        automation
            .navigate(url, LoadCondition::DomContentLoaded, navigation_timeout)
            .await?;
        self.settle(automation).await
    }

    /// Bring an already-navigated page to an interactable state.
    pub async fn settle(&self, automation: &dyn Automation) -> VitrinaResult<()> {
        self.accept_cookies_if_present(automation).await;
        self.dismiss_notification_bar_if_present(automation).await;
        self.open_mobile_menu_if_needed(automation).await;
        self.assert_affordance_visible(automation).await
    }

    /// Race the stable anchor against the cookie-consent controls; if a
    /// consent control wins (or is the one that showed up), accept it.
    /// Some locales render the consent button with no usable selector, so
    /// a text-matched fallback probes alongside the CSS one.
    async fn accept_cookies_if_present(&self, automation: &dyn Automation) {
        let anchor = ElementQuery::css(READY_ANCHOR).first();
        let consent_css = ElementQuery::css(COOKIE_CONSENT).first();
        let consent_text = ElementQuery::css("button")
            .with_text(COOKIE_CONSENT_TEXT)
            .first();
        let goals = [
            WaitGoal::Visible(anchor),
            WaitGoal::Visible(consent_css.clone()),
            WaitGoal::Visible(consent_text.clone()),
        ];
        match first_of(automation, &goals, self.timeouts.probe, DEFAULT_POLL_INTERVAL).await {
            Ok(0) => debug!("header anchor visible, no cookie banner"),
            Ok(winner) => {
                debug!("cookie consent visible, accepting");
                let consent = if winner == 1 { consent_css } else { consent_text };
                if automation.click(&consent).await.is_ok() {
                    // Absence after the click is all we need; a lingering
                    // banner is tolerated.
                    let _ = automation
                        .wait_for(&consent, WaitState::Hidden, self.timeouts.settle)
                        .await;
                }
            }
            Err(_) => debug!("neither anchor nor cookie banner within probe window"),
        }
    }

    /// Close the promo/notification bar if it is covering the header
    async fn dismiss_notification_bar_if_present(&self, automation: &dyn Automation) {
        let bar = ElementQuery::css(NOTIFICATION_BAR);
        if !quickly_visible(automation, &bar, self.timeouts.probe).await {
            return;
        }
        debug!("notification bar visible, dismissing");
        let close = ElementQuery::css(NOTIFICATION_CLOSE).first();
        if quickly_visible(automation, &close, self.timeouts.probe / 2).await
            && automation.click(&close).await.is_ok()
        {
            let _ = automation
                .wait_for(&bar, WaitState::Hidden, self.timeouts.settle)
                .await;
        }
    }

    /// On narrow layouts the affordance hides behind a menu toggle
    async fn open_mobile_menu_if_needed(&self, automation: &dyn Automation) {
        let affordance = ElementQuery::css(REGISTER_AFFORDANCE).first();
        if quickly_visible(automation, &affordance, self.timeouts.probe).await {
            return;
        }
        let toggle = ElementQuery::css(MENU_TOGGLE).first();
        if quickly_visible(automation, &toggle, self.timeouts.probe).await {
            debug!("narrow layout detected, opening menu");
            if automation.click(&toggle).await.is_ok() {
                let _ = automation
                    .wait_for(&affordance, WaitState::Visible, self.timeouts.menu_reveal)
                    .await;
            }
        }
    }

    /// The mandatory wait: without the affordance the session is unusable
    async fn assert_affordance_visible(&self, automation: &dyn Automation) -> VitrinaResult<()> {
        let affordance = ElementQuery::css(REGISTER_AFFORDANCE).first();
        automation
            .wait_for(&affordance, WaitState::Visible, self.timeouts.final_check)
            .await
            .map_err(|_| VitrinaError::NotReady {
                detail: format!(
                    "primary navigation affordance '{REGISTER_AFFORDANCE}' not visible within {}ms",
                    self.timeouts.final_check.as_millis()
                ),
            })
    }
}
