//! Element queries: selector expressions plus refinements.
//!
//! Selector strings are opaque configuration data owned by the page models;
//! the query type only carries them to the automation capability together
//! with an optional refinement (first match, nth match, filter by text).

use serde::{Deserialize, Serialize};

/// Narrowing applied to the elements matched by a selector expression
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Refinement {
    /// All matches (strictness is up to the capability)
    #[default]
    None,
    /// First match only
    First,
    /// The n-th match (zero-based)
    Nth(usize),
}

/// A query for one or more elements on the live page.
///
/// ```
/// use vitrina::ElementQuery;
///
/// let q = ElementQuery::css(".product-item .product-title a")
///     .with_text("Build your own computer")
///     .first();
/// assert_eq!(q.selector(), ".product-item .product-title a");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementQuery {
    selector: String,
    refinement: Refinement,
    text_filter: Option<String>,
}

impl ElementQuery {
    /// Create a query from a CSS selector expression
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            refinement: Refinement::None,
            text_filter: None,
        }
    }

    /// Take only the first match
    #[must_use]
    pub fn first(mut self) -> Self {
        self.refinement = Refinement::First;
        self
    }

    /// Take only the n-th match (zero-based)
    #[must_use]
    pub fn nth(mut self, n: usize) -> Self {
        self.refinement = Refinement::Nth(n);
        self
    }

    /// Keep only matches whose text content contains `text`
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_filter = Some(text.into());
        self
    }

    /// The underlying selector expression
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// The positional refinement
    #[must_use]
    pub fn refinement(&self) -> &Refinement {
        &self.refinement
    }

    /// The text filter, if any
    #[must_use]
    pub fn text_filter(&self) -> Option<&str> {
        self.text_filter.as_deref()
    }

    /// A human-readable description for wait/timeout diagnostics
    #[must_use]
    pub fn describe(&self) -> String {
        let mut s = self.selector.clone();
        if let Some(text) = &self.text_filter {
            s.push_str(&format!(" [text~'{text}']"));
        }
        match &self.refinement {
            Refinement::None => {}
            Refinement::First => s.push_str(" [first]"),
            Refinement::Nth(n) => s.push_str(&format!(" [nth={n}]")),
        }
        s
    }
}
