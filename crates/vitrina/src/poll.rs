//! Price stabilization polling.
//!
//! A product's displayed price updates asynchronously after configuration
//! options change. Callers must not read or act on it until it has either
//! reached an expected value or stopped changing for a stabilization window.

use crate::capability::Automation;
use crate::locator::ElementQuery;
use crate::result::{VitrinaError, VitrinaResult};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Fixed sampling interval of the convergence loop
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(200);

/// Absolute tolerance when comparing against an expected value
pub const PRICE_TOLERANCE: f64 = 0.01;

/// Default overall timeout for stabilization
pub const DEFAULT_PRICE_TIMEOUT: Duration = Duration::from_secs(15);

/// Default unchanged-duration required to call the price converged
pub const DEFAULT_STABLE_WINDOW: Duration = Duration::from_millis(800);

/// Parse a currency-formatted string to a number.
///
/// Strips everything except digits, the decimal point and a leading minus,
/// so `"$1,250.00"` parses to `1250.0`. Errors carry the raw text.
pub fn parse_price(raw: &str) -> VitrinaResult<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned
        .parse::<f64>()
        .map_err(|_| VitrinaError::Currency {
            raw: raw.to_string(),
        })
}

/// Wait until the price display converges.
///
/// Each `SAMPLE_INTERVAL` the display text is sampled:
/// - if `expected` is given and the parsed value is within
///   [`PRICE_TOLERANCE`] of it, succeed immediately;
/// - else if the raw text is unchanged since the previous sample, accumulate
///   unchanged time and succeed once it reaches `stable_window`;
/// - else reset the accumulator and keep sampling.
///
/// Fails with [`VitrinaError::PriceUnsettled`] carrying the last observed
/// raw text once `timeout` elapses, since a silently-unsettled price would
/// hide a real pricing regression.
pub async fn await_stable_price(
    automation: &dyn Automation,
    price_display: &ElementQuery,
    expected: Option<f64>,
    timeout: Duration,
    stable_window: Duration,
) -> VitrinaResult<()> {
    let start = Instant::now();
    let mut last_text: Option<String> = None;
    let mut unchanged = Duration::ZERO;

    while start.elapsed() < timeout {
        let raw = automation.inner_text(price_display).await?.trim().to_string();

        if let Some(expected) = expected {
            // A transiently unparseable display (e.g. mid-update) is treated
            // as a non-match, not an error.
            if let Ok(current) = parse_price(&raw) {
                if (current - expected).abs() < PRICE_TOLERANCE {
                    return Ok(());
                }
            }
        }

        if last_text.as_deref() == Some(raw.as_str()) {
            sleep(SAMPLE_INTERVAL).await;
            unchanged += SAMPLE_INTERVAL;
            if unchanged >= stable_window {
                return Ok(());
            }
        } else {
            last_text = Some(raw);
            unchanged = Duration::ZERO;
            sleep(SAMPLE_INTERVAL).await;
        }
    }

    Err(VitrinaError::PriceUnsettled {
        last_text: last_text.unwrap_or_default(),
        timeout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedAutomation;

    const PRICE: &str = "span.price-value-1";

    fn display() -> ElementQuery {
        ElementQuery::css(PRICE)
    }

    #[test]
    fn parse_price_strips_currency_formatting() {
        assert_eq!(parse_price("$1,250.00").unwrap(), 1250.0);
        assert_eq!(parse_price("€999").unwrap(), 999.0);
        assert_eq!(parse_price("1 250.00").unwrap(), 1250.0);
        assert!(parse_price("free!").is_err());
    }

    #[test]
    fn parse_price_error_carries_raw_text() {
        let err = parse_price("n/a").unwrap_err();
        assert!(err.to_string().contains("n/a"));
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_text_converges_after_stable_window_not_before() {
        let automation = ScriptedAutomation::new();
        automation.set_text_sequence(PRICE, &["$999.00"]);

        let start = Instant::now();
        await_stable_price(
            &automation,
            &display(),
            None,
            DEFAULT_PRICE_TIMEOUT,
            DEFAULT_STABLE_WINDOW,
        )
        .await
        .unwrap();

        // First sample seeds the baseline; the window accumulates only
        // across unchanged follow-up samples.
        assert!(start.elapsed() >= DEFAULT_STABLE_WINDOW);
        assert!(start.elapsed() < DEFAULT_PRICE_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn expected_match_succeeds_before_stability() {
        let automation = ScriptedAutomation::new();
        automation.set_text_sequence(PRICE, &["$1,100.00", "$1,250.00"]);

        let start = Instant::now();
        await_stable_price(
            &automation,
            &display(),
            Some(1250.0),
            DEFAULT_PRICE_TIMEOUT,
            DEFAULT_STABLE_WINDOW,
        )
        .await
        .unwrap();

        // Succeeded on the second sample, well inside the stability window.
        assert!(start.elapsed() < DEFAULT_STABLE_WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn expected_match_tolerates_a_cent() {
        let automation = ScriptedAutomation::new();
        automation.set_text_sequence(PRICE, &["$1,249.995"]);
        await_stable_price(
            &automation,
            &display(),
            Some(1250.0),
            DEFAULT_PRICE_TIMEOUT,
            DEFAULT_STABLE_WINDOW,
        )
        .await
        .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn never_settling_price_times_out_with_last_text() {
        let automation = ScriptedAutomation::new();
        // Alternates forever; the scripted sequence is long enough to cover
        // every sample within the short timeout below.
        automation.set_text_sequence(
            PRICE,
            &["$1.00", "$2.00", "$1.00", "$2.00", "$1.00", "$2.00", "$1.00", "$2.00"],
        );

        let err = await_stable_price(
            &automation,
            &display(),
            Some(1250.0),
            Duration::from_millis(1000),
            DEFAULT_STABLE_WINDOW,
        )
        .await
        .unwrap_err();

        match &err {
            VitrinaError::PriceUnsettled { last_text, .. } => {
                assert!(last_text.contains("$2.00") || last_text.contains("$1.00"));
            }
            other => panic!("expected PriceUnsettled, got {other}"),
        }
        assert!(err.to_string().contains("did not stabilize"));
    }
}
