//! Shopping cart page.

use crate::capability::Automation;
use crate::locator::ElementQuery;
use crate::poll::parse_price;
use crate::result::{VitrinaError, VitrinaResult};
use crate::wait::{first_of, WaitGoal, DEFAULT_POLL_INTERVAL};
use std::time::Duration;

/// Cart contents table
pub const CART_TABLE: &str = "table.cart";
/// Summary block carrying the empty-cart message
pub const ORDER_SUMMARY: &str = "div.order-summary-content";
/// Empty-cart message text (matched case-insensitively by the capability)
pub const EMPTY_MESSAGE: &str = "Your shopping cart is empty";

const ROW_NAME: &str = "table.cart td.product a";
const ROW_UNIT_PRICE: &str = "table.cart td.unit-price";
const ROW_QTY_INPUT: &str = "table.cart input.qty-input";
const ROW_SUBTOTAL: &str = "table.cart td.subtotal";

/// Default wait for the cart page to resolve into one of its two states
const LOADED_TIMEOUT: Duration = Duration::from_secs(15);

fn empty_marker() -> ElementQuery {
    ElementQuery::css(ORDER_SUMMARY).with_text(EMPTY_MESSAGE)
}

/// Cart page model
pub struct CartPage<'a> {
    automation: &'a dyn Automation,
}

impl std::fmt::Debug for CartPage<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartPage").finish_non_exhaustive()
    }
}

impl<'a> CartPage<'a> {
    /// Model over a session currently on the cart page
    #[must_use]
    pub fn new(automation: &'a dyn Automation) -> Self {
        Self { automation }
    }

    /// Wait until the page settles into either state: the contents table,
    /// or the empty-cart message. Which one is not this method's business.
    pub async fn wait_loaded(&self) -> VitrinaResult<()> {
        let goals = [
            WaitGoal::Visible(ElementQuery::css(CART_TABLE).first()),
            WaitGoal::Visible(empty_marker()),
        ];
        let _ = first_of(self.automation, &goals, LOADED_TIMEOUT, DEFAULT_POLL_INTERVAL).await?;
        Ok(())
    }

    /// Whether the cart is showing the empty message
    pub async fn is_empty(&self) -> VitrinaResult<bool> {
        Ok(self.automation.count(&empty_marker()).await? > 0)
    }

    /// Trimmed product name of the first cart row
    pub async fn first_item_name(&self) -> VitrinaResult<String> {
        self.first_row_text(ROW_NAME).await
    }

    /// Raw unit price text of the first cart row
    pub async fn first_item_unit_price_raw(&self) -> VitrinaResult<String> {
        self.first_row_text(ROW_UNIT_PRICE).await
    }

    /// Raw subtotal text of the first cart row
    pub async fn first_item_subtotal_raw(&self) -> VitrinaResult<String> {
        self.first_row_text(ROW_SUBTOTAL).await
    }

    /// Parsed unit price of the first cart row
    pub async fn first_item_unit_price(&self) -> VitrinaResult<f64> {
        parse_price(&self.first_item_unit_price_raw().await?)
    }

    /// Parsed subtotal of the first cart row
    pub async fn first_item_subtotal(&self) -> VitrinaResult<f64> {
        parse_price(&self.first_item_subtotal_raw().await?)
    }

    /// Quantity in the first cart row's input
    pub async fn first_item_qty(&self) -> VitrinaResult<u32> {
        let query = ElementQuery::css(ROW_QTY_INPUT).first();
        let raw = self.automation.input_value(&query).await?;
        raw.trim()
            .parse()
            .map_err(|_| VitrinaError::Interaction {
                selector: ROW_QTY_INPUT.to_string(),
                message: format!("quantity input holds non-numeric value '{raw}'"),
            })
    }

    async fn first_row_text(&self, selector: &str) -> VitrinaResult<String> {
        let query = ElementQuery::css(selector).first();
        Ok(self.automation.inner_text(&query).await?.trim().to_string())
    }
}
