//! Account registration page.

use crate::capability::Automation;
use crate::credentials::Credentials;
use crate::locator::ElementQuery;
use crate::result::VitrinaResult;

const GENDER_FEMALE: &str = "#gender-female";
const FIRST_NAME: &str = "#FirstName";
const LAST_NAME: &str = "#LastName";
const EMAIL: &str = "#Email";
const PASSWORD: &str = "#Password";
const CONFIRM_PASSWORD: &str = "#ConfirmPassword";
const SUBMIT: &str = "#register-button";
const CONTINUE: &str = "a.register-continue-button";

/// Outcome block shown after submitting the form
pub const RESULT_BLOCK: &str = ".result";

/// Registration page model
pub struct RegisterPage<'a> {
    automation: &'a dyn Automation,
}

impl std::fmt::Debug for RegisterPage<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterPage").finish_non_exhaustive()
    }
}

impl<'a> RegisterPage<'a> {
    /// Model over a session currently on the registration page
    #[must_use]
    pub fn new(automation: &'a dyn Automation) -> Self {
        Self { automation }
    }

    /// Fill and submit the form for a new account
    pub async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        credentials: &Credentials,
    ) -> VitrinaResult<()> {
        self.automation.check(&ElementQuery::css(GENDER_FEMALE)).await?;
        self.fill(FIRST_NAME, first_name).await?;
        self.fill(LAST_NAME, last_name).await?;
        self.fill(EMAIL, &credentials.email).await?;
        self.fill(PASSWORD, &credentials.password).await?;
        self.fill(CONFIRM_PASSWORD, &credentials.password).await?;
        self.automation.click(&ElementQuery::css(SUBMIT)).await
    }

    /// Trimmed text of the post-submit result block
    pub async fn result_text(&self) -> VitrinaResult<String> {
        Ok(self
            .automation
            .inner_text(&ElementQuery::css(RESULT_BLOCK))
            .await?
            .trim()
            .to_string())
    }

    /// Click the post-registration continue button back to the store
    pub async fn continue_to_store(&self) -> VitrinaResult<()> {
        self.automation.click(&ElementQuery::css(CONTINUE)).await
    }

    async fn fill(&self, selector: &str, value: &str) -> VitrinaResult<()> {
        self.automation.fill(&ElementQuery::css(selector), value).await
    }
}
