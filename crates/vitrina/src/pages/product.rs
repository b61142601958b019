//! Product detail page: attribute configuration, price display, add to cart.

use super::CONTROL_TIMEOUT;
use crate::capability::{Automation, WaitState};
use crate::locator::ElementQuery;
use crate::poll::{self, DEFAULT_PRICE_TIMEOUT, DEFAULT_STABLE_WINDOW};
use crate::result::VitrinaResult;
use crate::wait::{first_of, WaitGoal, DEFAULT_POLL_INTERVAL};
use std::time::Duration;
use tracing::debug;

/// Product title heading
pub const TITLE: &str = "div.product-name h1";
/// Dynamic price display on the detail page
pub const PRICE_DISPLAY: &str = "span.price-value-1";
/// Add-to-cart button
pub const ADD_TO_CART: &str = "button#add-to-cart-button-1";
/// Success toast shown after adding
pub const SUCCESS_TOAST: &str = "#bar-notification.success";
/// Close control inside the toast
pub const TOAST_CLOSE: &str = "#bar-notification.success .close";
/// Header cart badge (the other add-confirmation signal)
pub const CART_BADGE: &str = "span.cart-qty";

const PROCESSOR_SELECT: &str = "#product_attribute_1";
const RAM_SELECT: &str = "#product_attribute_2";
const SOFTWARE_CHECKBOXES: &str = "input[name='product_attribute_5']";
const ATTRIBUTE_OPTION_LABELS: &str = "#product-details-form dd label";

/// Shared timeout for the toast-vs-badge confirmation race
const ADD_CONFIRM_TIMEOUT: Duration = Duration::from_secs(8);

/// Base configuration of the reference product: cheapest processor, 2 GB
/// RAM, 320 GB disk, Vista Home, no extra software. Settles at 1250.00.
pub const BASE_PROCESSOR: &str = "2.2 GHz Intel Pentium Dual-Core E2200";
/// RAM option of the base configuration
pub const BASE_RAM: &str = "2 GB";
/// HDD option of the base configuration
pub const BASE_HDD: &str = "320 GB";
/// OS option of the base configuration
pub const BASE_OS: &str = "Vista Home";
/// Price the base configuration settles at
pub const BASE_PRICE: f64 = 1250.0;

/// Product detail page model
pub struct ProductPage<'a> {
    automation: &'a dyn Automation,
}

impl std::fmt::Debug for ProductPage<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductPage").finish_non_exhaustive()
    }
}

impl<'a> ProductPage<'a> {
    /// Model over a session currently on a product detail page
    #[must_use]
    pub fn new(automation: &'a dyn Automation) -> Self {
        Self { automation }
    }

    /// Trimmed product title
    pub async fn title(&self) -> VitrinaResult<String> {
        Ok(self
            .automation
            .inner_text(&ElementQuery::css(TITLE))
            .await?
            .trim()
            .to_string())
    }

    /// Raw text of the price display, trimmed but unparsed
    pub async fn displayed_price_raw(&self) -> VitrinaResult<String> {
        Ok(self
            .automation
            .inner_text(&ElementQuery::css(PRICE_DISPLAY))
            .await?
            .trim()
            .to_string())
    }

    /// Select a processor by its option label
    pub async fn select_processor(&self, label: &str) -> VitrinaResult<()> {
        self.automation
            .select_by_label(&ElementQuery::css(PROCESSOR_SELECT), label)
            .await
    }

    /// Select a RAM size by its option label
    pub async fn select_ram(&self, label: &str) -> VitrinaResult<()> {
        self.automation
            .select_by_label(&ElementQuery::css(RAM_SELECT), label)
            .await
    }

    /// Pick a radio attribute (HDD, OS) by clicking its label text
    pub async fn choose_option(&self, label: &str) -> VitrinaResult<()> {
        let option = ElementQuery::css(ATTRIBUTE_OPTION_LABELS)
            .with_text(label)
            .first();
        self.automation.click(&option).await
    }

    /// Uncheck every pre-selected software add-on; they inflate the price
    pub async fn clear_software_addons(&self) -> VitrinaResult<()> {
        let all = ElementQuery::css(SOFTWARE_CHECKBOXES);
        let count = self.automation.count(&all).await?;
        for i in 0..count {
            let checkbox = ElementQuery::css(SOFTWARE_CHECKBOXES).nth(i);
            if self.automation.is_checked(&checkbox).await? {
                self.automation.uncheck(&checkbox).await?;
            }
        }
        Ok(())
    }

    /// Apply the reference base configuration and wait for the price to
    /// settle at [`BASE_PRICE`]
    pub async fn apply_base_configuration(&self) -> VitrinaResult<()> {
        self.select_processor(BASE_PROCESSOR).await?;
        self.select_ram(BASE_RAM).await?;
        self.choose_option(BASE_HDD).await?;
        self.choose_option(BASE_OS).await?;
        self.clear_software_addons().await?;
        self.await_price(Some(BASE_PRICE)).await
    }

    /// Wait until the price display converges, optionally on an expected value
    pub async fn await_price(&self, expected: Option<f64>) -> VitrinaResult<()> {
        poll::await_stable_price(
            self.automation,
            &ElementQuery::css(PRICE_DISPLAY),
            expected,
            DEFAULT_PRICE_TIMEOUT,
            DEFAULT_STABLE_WINDOW,
        )
        .await
    }

    /// Add the configured product to the cart and wait for confirmation.
    ///
    /// Confirmation is whichever comes first: the success toast, or the
    /// header badge text changing from its pre-click baseline. A winning
    /// toast is dismissed best-effort so it cannot cover later clicks.
    pub async fn add_to_cart(&self) -> VitrinaResult<()> {
        let badge = ElementQuery::css(CART_BADGE);
        let baseline = self.automation.inner_text(&badge).await?.trim().to_string();

        let button = ElementQuery::css(ADD_TO_CART);
        self.automation
            .wait_for(&button, WaitState::Visible, CONTROL_TIMEOUT)
            .await?;
        self.automation.click(&button).await?;

        let toast = ElementQuery::css(SUCCESS_TOAST);
        let goals = [
            WaitGoal::Visible(toast.clone()),
            WaitGoal::TextChanged {
                query: badge,
                baseline,
            },
        ];
        let winner = first_of(
            self.automation,
            &goals,
            ADD_CONFIRM_TIMEOUT,
            DEFAULT_POLL_INTERVAL,
        )
        .await?;

        if winner == 0 {
            self.dismiss_toast(&toast).await;
        } else {
            debug!("cart badge changed, item added");
        }
        Ok(())
    }

    async fn dismiss_toast(&self, toast: &ElementQuery) {
        let close = ElementQuery::css(TOAST_CLOSE).first();
        if self.automation.click(&close).await.is_ok() {
            let _ = self
                .automation
                .wait_for(toast, WaitState::Hidden, CONTROL_TIMEOUT)
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedAutomation;

    #[tokio::test(start_paused = true)]
    async fn base_configuration_selects_everything_then_settles() {
        let automation = ScriptedAutomation::new();
        automation.set_text_sequence(PRICE_DISPLAY, &["$1,250.00"]);
        automation.set_count(SOFTWARE_CHECKBOXES, 0);

        let page = ProductPage::new(&automation);
        page.apply_base_configuration().await.unwrap();

        let calls = automation.calls();
        assert!(calls.contains(&format!("select:{PROCESSOR_SELECT}={BASE_PROCESSOR}")));
        assert!(calls.contains(&format!("select:{RAM_SELECT}={BASE_RAM}")));
        assert_eq!(
            automation.calls_matching(&format!("click:{ATTRIBUTE_OPTION_LABELS}")),
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn clear_software_addons_unchecks_only_checked_boxes() {
        let automation = ScriptedAutomation::new();
        automation.set_count(SOFTWARE_CHECKBOXES, 3);
        let middle = ElementQuery::css(SOFTWARE_CHECKBOXES).nth(1);
        automation.check(&middle).await.unwrap();

        let page = ProductPage::new(&automation);
        page.clear_software_addons().await.unwrap();

        assert_eq!(automation.calls_matching("uncheck:"), 1);
        assert!(!automation.is_checked(&middle).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn add_to_cart_dismisses_a_winning_toast() {
        let automation = ScriptedAutomation::new();
        automation.set_visible(ADD_TO_CART);
        automation.set_text_sequence(CART_BADGE, &["(0)"]);
        automation.reveal_on_click(ADD_TO_CART, SUCCESS_TOAST);
        automation.hide_on_click(TOAST_CLOSE, SUCCESS_TOAST);

        let page = ProductPage::new(&automation);
        page.add_to_cart().await.unwrap();

        assert_eq!(automation.calls_matching(&format!("click:{TOAST_CLOSE}")), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn add_to_cart_accepts_a_badge_change_without_toast() {
        let automation = ScriptedAutomation::new();
        automation.set_visible(ADD_TO_CART);
        automation.set_text_sequence(CART_BADGE, &["(0)", "(0)", "(1)"]);

        let page = ProductPage::new(&automation);
        page.add_to_cart().await.unwrap();

        assert_eq!(automation.calls_matching(&format!("click:{TOAST_CLOSE}")), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn add_to_cart_times_out_without_any_confirmation() {
        let automation = ScriptedAutomation::new();
        automation.set_visible(ADD_TO_CART);
        automation.set_text_sequence(CART_BADGE, &["(0)"]);

        let page = ProductPage::new(&automation);
        let err = page.add_to_cart().await.unwrap_err();
        assert!(err.is_timeout());
    }
}
