//! Page models for the storefront under test.
//!
//! Each model is a thin veneer over the automation capability: it owns the
//! selectors and interaction order for one page and nothing else. No
//! waiting strategy lives here beyond what a single interaction needs;
//! readiness and price convergence are the core's job.

pub mod cart;
pub mod home;
pub mod login;
pub mod product;
pub mod register;
pub mod search;

pub use cart::CartPage;
pub use home::HomePage;
pub use login::LoginPage;
pub use product::ProductPage;
pub use register::RegisterPage;
pub use search::SearchResultsPage;

use std::time::Duration;

/// Default wait before interacting with a page-level control
pub(crate) const CONTROL_TIMEOUT: Duration = Duration::from_secs(10);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedAutomation;

    // Models borrow the capability as a trait object, so Debug has to be
    // hand-written rather than derived.
    #[test]
    fn every_page_model_formats_for_debug() {
        let automation = ScriptedAutomation::new();
        assert!(format!("{:?}", HomePage::new(&automation)).contains("HomePage"));
        assert!(format!("{:?}", LoginPage::new(&automation)).contains("LoginPage"));
        assert!(format!("{:?}", RegisterPage::new(&automation)).contains("RegisterPage"));
        assert!(format!("{:?}", ProductPage::new(&automation)).contains("ProductPage"));
        assert!(format!("{:?}", CartPage::new(&automation)).contains("CartPage"));
        assert!(format!("{:?}", SearchResultsPage::new(&automation)).contains("SearchResultsPage"));
    }
}
