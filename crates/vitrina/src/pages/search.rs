//! Search results page.

use super::CONTROL_TIMEOUT;
use crate::capability::{Automation, WaitState};
use crate::locator::ElementQuery;
use crate::result::VitrinaResult;

/// Title links of the result cards
pub const PRODUCT_TITLES: &str = ".product-item .product-title a";

/// Search results page model
pub struct SearchResultsPage<'a> {
    automation: &'a dyn Automation,
}

impl std::fmt::Debug for SearchResultsPage<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchResultsPage").finish_non_exhaustive()
    }
}

impl<'a> SearchResultsPage<'a> {
    /// Model over a session currently on the results page
    #[must_use]
    pub fn new(automation: &'a dyn Automation) -> Self {
        Self { automation }
    }

    /// How many result cards are showing
    pub async fn result_count(&self) -> VitrinaResult<usize> {
        self.automation.count(&ElementQuery::css(PRODUCT_TITLES)).await
    }

    /// Whether a result titled `title` is present
    pub async fn has_product(&self, title: &str) -> VitrinaResult<bool> {
        let query = ElementQuery::css(PRODUCT_TITLES).with_text(title);
        Ok(self.automation.count(&query).await? > 0)
    }

    /// Open the result titled `title`
    pub async fn open_product(&self, title: &str) -> VitrinaResult<()> {
        let link = ElementQuery::css(PRODUCT_TITLES).with_text(title).first();
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

    #[tokio::test]
    async fn has_product_reflects_match_count() {
        let automation = ScriptedAutomation::new();
        let page = SearchResultsPage::new(&automation);
        assert!(!page.has_product("Build your own computer").await.unwrap());

        automation.set_count(PRODUCT_TITLES, 1);
        assert!(page.has_product("Build your own computer").await.unwrap());
        assert_eq!(page.result_count().await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn open_product_clicks_the_filtered_title() {
        let automation = ScriptedAutomation::new();
        automation.set_visible(PRODUCT_TITLES);
        let page = SearchResultsPage::new(&automation);
        page.open_product("Build your own computer").await.unwrap();
        assert_eq!(automation.calls_matching(&format!("click:{PRODUCT_TITLES}")), 1);
    }
}
