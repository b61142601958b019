//! Login page.

use super::CONTROL_TIMEOUT;
use crate::capability::Automation;
use crate::credentials::Credentials;
use crate::locator::ElementQuery;
use crate::result::VitrinaResult;
use crate::wait::quickly_visible;

const EMAIL: &str = "#Email";
const PASSWORD: &str = "#Password";
const SUBMIT: &str = "button.login-button";

/// Validation summary shown on a rejected login
pub const ERROR_SUMMARY: &str = ".message-error.validation-summary-errors";

/// Logged-in account indicator (shared with the header)
pub const ACCOUNT_LINK: &str = "a.ico-account";

/// Login page model
pub struct LoginPage<'a> {
    automation: &'a dyn Automation,
}

impl std::fmt::Debug for LoginPage<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginPage").finish_non_exhaustive()
    }
}

impl<'a> LoginPage<'a> {
    /// Model over a session currently on the login page
    #[must_use]
    pub fn new(automation: &'a dyn Automation) -> Self {
        Self { automation }
    }

    /// Fill and submit the login form
    pub async fn login(&self, credentials: &Credentials) -> VitrinaResult<()> {
        self.automation
            .fill(&ElementQuery::css(EMAIL), &credentials.email)
            .await?;
        self.automation
            .fill(&ElementQuery::css(PASSWORD), &credentials.password)
            .await?;
        self.automation.click(&ElementQuery::css(SUBMIT)).await
    }

    /// Whether the account indicator is showing (login accepted)
    pub async fn is_account_visible(&self) -> bool {
        quickly_visible(
            self.automation,
            &ElementQuery::css(ACCOUNT_LINK),
            CONTROL_TIMEOUT,
        )
        .await
    }

    /// Whether the validation summary is showing (login rejected)
    pub async fn is_error_visible(&self) -> bool {
        quickly_visible(
            self.automation,
            &ElementQuery::css(ERROR_SUMMARY),
            CONTROL_TIMEOUT,
        )
        .await
    }

    /// Trimmed text of the validation summary
    pub async fn error_text(&self) -> VitrinaResult<String> {
        Ok(self
            .automation
            .inner_text(&ElementQuery::css(ERROR_SUMMARY))
            .await?
            .trim()
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedAutomation;

    #[tokio::test]
    async fn login_fills_then_submits() {
        let automation = ScriptedAutomation::new();
        let page = LoginPage::new(&automation);
        let credentials = Credentials {
            email: "qa@example.com".to_string(),
            password: "pw".to_string(),
        };
        page.login(&credentials).await.unwrap();

        let calls = automation.calls();
        assert_eq!(
            calls,
            vec![
                "fill:#Email=qa@example.com".to_string(),
                "fill:#Password=pw".to_string(),
                format!("click:{SUBMIT}"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_shows_error_not_account() {
        let automation = ScriptedAutomation::new();
        automation.set_visible(ERROR_SUMMARY);
        automation.set_text_sequence(ERROR_SUMMARY, &["Login was unsuccessful."]);

        let page = LoginPage::new(&automation);
        assert!(page.is_error_visible().await);
        assert!(!page.is_account_visible().await);
        assert!(page.error_text().await.unwrap().contains("unsuccessful"));
    }
}
