//! Storefront home page: header links and the search box.

use super::CONTROL_TIMEOUT;
use crate::capability::{Automation, WaitState};
use crate::locator::ElementQuery;
use crate::readiness::REGISTER_AFFORDANCE;
use crate::result::VitrinaResult;
use crate::wait::quickly_visible;

/// Header login link
pub const LOGIN_LINK: &str = "a.ico-login";
/// Header cart link
pub const CART_LINK: &str = "a.ico-cart";
/// Logged-in account indicator
pub const ACCOUNT_LINK: &str = "a.ico-account";
/// Cart quantity badge in the header
pub const CART_BADGE: &str = "span.cart-qty";
/// Header search input
pub const SEARCH_INPUT: &str = "#small-searchterms";

/// Home page model
pub struct HomePage<'a> {
    automation: &'a dyn Automation,
}

impl std::fmt::Debug for HomePage<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HomePage").finish_non_exhaustive()
    }
}

impl<'a> HomePage<'a> {
    /// Model over an already-ready session
    #[must_use]
    pub fn new(automation: &'a dyn Automation) -> Self {
        Self { automation }
    }

    /// Open the registration page from the header
    pub async fn open_register(&self) -> VitrinaResult<()> {
        self.click_header_link(REGISTER_AFFORDANCE).await
    }

    /// Open the login page from the header
    pub async fn open_login(&self) -> VitrinaResult<()> {
        self.click_header_link(LOGIN_LINK).await
    }

    /// Open the shopping cart from the header
    pub async fn open_cart(&self) -> VitrinaResult<()> {
        self.click_header_link(CART_LINK).await
    }

    /// Search via the header box by pressing Enter
    pub async fn search(&self, term: &str) -> VitrinaResult<()> {
        let input = ElementQuery::css(SEARCH_INPUT);
        self.automation
            .wait_for(&input, WaitState::Visible, CONTROL_TIMEOUT)
            .await?;
        self.automation.fill(&input, term).await?;
        self.automation.press(&input, "Enter").await
    }

    /// Whether a signed-in account indicator is showing
    pub async fn is_logged_in(&self) -> bool {
        quickly_visible(
            self.automation,
            &ElementQuery::css(ACCOUNT_LINK),
            CONTROL_TIMEOUT,
        )
        .await
    }

    /// Raw text of the header cart badge, e.g. `"(1)"`
    pub async fn cart_badge_text(&self) -> VitrinaResult<String> {
        Ok(self
            .automation
            .inner_text(&ElementQuery::css(CART_BADGE))
            .await?
            .trim()
            .to_string())
    }

    async fn click_header_link(&self, selector: &str) -> VitrinaResult<()> {
        let link = ElementQuery::css(selector).first();
        self.automation
            .wait_for(&link, WaitState::Visible, CONTROL_TIMEOUT)
            .await?;
        self.automation.click(&link).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedAutomation;

    #[tokio::test(start_paused = true)]
    async fn search_fills_the_box_and_presses_enter() {
        let automation = ScriptedAutomation::new();
        automation.set_visible(SEARCH_INPUT);

        let home = HomePage::new(&automation);
        home.search("Build your own computer").await.unwrap();

        assert!(automation
            .calls()
            .contains(&format!("fill:{SEARCH_INPUT}=Build your own computer")));
        assert_eq!(
            automation.calls_matching(&format!("press:{SEARCH_INPUT}:Enter")),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn header_links_wait_then_click() {
        let automation = ScriptedAutomation::new();
        automation.set_visible(LOGIN_LINK);
        automation.set_visible(CART_LINK);

        let home = HomePage::new(&automation);
        home.open_login().await.unwrap();
        home.open_cart().await.unwrap();

        assert_eq!(automation.calls_matching(&format!("click:{LOGIN_LINK}")), 1);
        assert_eq!(automation.calls_matching(&format!("click:{CART_LINK}")), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn logged_in_reflects_account_indicator() {
        let automation = ScriptedAutomation::new();
        let home = HomePage::new(&automation);
        assert!(!home.is_logged_in().await);

        automation.set_visible(ACCOUNT_LINK);
        assert!(home.is_logged_in().await);
    }
}
