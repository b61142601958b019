//! Run configuration: defaults, optional JSON file, environment overrides.
//!
//! Resolution happens once per run, before any session exists, and the
//! result is immutable afterwards. Precedence, lowest to highest: built-in
//! defaults, `vitrina.json` (each field individually; an unparseable field
//! falls back and is logged, never fatal), environment variables. A `CI`
//! signal with no explicit `HEADLESS` override forces headless.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Default storefront under test
pub const DEFAULT_BASE_URL: &str = "https://demo.nopcommerce.com";

/// Default config file looked up next to the test binary's working directory
pub const DEFAULT_CONFIG_FILE: &str = "vitrina.json";

/// Default action timeout (60s, matching the demo storefront's worst case)
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Navigation timeout never drops below this locally
const NAVIGATION_FLOOR: Duration = Duration::from_secs(45);

/// ...and never below this on CI runners
const NAVIGATION_FLOOR_CI: Duration = Duration::from_secs(60);

/// Browser engine kind requested by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    /// Chromium (the default, and the only kind the bundled CDP engine drives)
    #[default]
    Chromium,
    /// Firefox
    Firefox,
    /// WebKit
    Webkit,
}

impl BrowserKind {
    /// Parse permissively: unknown values fall back to Chromium (logged)
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "firefox" => Self::Firefox,
            "webkit" => Self::Webkit,
            "chromium" | "chrome" => Self::Chromium,
            other => {
                warn!(browser = other, "unknown browser kind, using chromium");
                Self::Chromium
            }
        }
    }

    /// Canonical name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chromium => "chromium",
            Self::Firefox => "firefox",
            Self::Webkit => "webkit",
        }
    }
}

/// Browser viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1366,
            height: 768,
        }
    }
}

/// Environment overrides, read once from the process environment.
///
/// Split out as a plain value so resolution is testable without mutating
/// process-global state.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    /// `BROWSER`
    pub browser: Option<String>,
    /// `BASE_URL`
    pub base_url: Option<String>,
    /// `HEADLESS` ("1"/"true", case-insensitive)
    pub headless: Option<String>,
    /// `PW_TIMEOUT` in milliseconds
    pub timeout_ms: Option<String>,
    /// whether `CI` is set non-empty
    pub ci: bool,
}

impl EnvOverrides {
    /// Snapshot the relevant variables from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        let get = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            browser: get("BROWSER"),
            base_url: get("BASE_URL"),
            headless: get("HEADLESS"),
            timeout_ms: get("PW_TIMEOUT"),
            ci: get("CI").is_some(),
        }
    }
}

/// Parse a permissive boolean: "1"/"true" (case-insensitive) are true
fn parse_bool(value: &str) -> bool {
    let v = value.trim();
    v.eq_ignore_ascii_case("1") || v.eq_ignore_ascii_case("true")
}

/// The resolved, immutable per-run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfiguration {
    /// Storefront base URL
    pub base_url: String,
    /// Requested browser kind
    pub browser: BrowserKind,
    /// Headless launch
    pub headless: bool,
    /// Session viewport
    pub viewport: Viewport,
    /// Default action timeout applied to every session
    pub default_timeout: Duration,
    /// Whether a CI signal was present at resolution time
    pub under_ci: bool,
    /// Root directory for failure artifacts
    pub artifact_root: PathBuf,
    /// Working directory for transient run files (credential hand-off)
    pub workdir: PathBuf,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            browser: BrowserKind::Chromium,
            headless: true,
            viewport: Viewport::default(),
            default_timeout: DEFAULT_ACTION_TIMEOUT,
            under_ci: false,
            artifact_root: PathBuf::from("artifacts"),
            workdir: PathBuf::from("."),
        }
    }
}

impl RunConfiguration {
    /// Resolve from `vitrina.json` (if present) and the process environment
    #[must_use]
    pub fn resolve() -> Self {
        Self::resolve_from(Some(Path::new(DEFAULT_CONFIG_FILE)), &EnvOverrides::from_env())
    }

    /// Resolve from an explicit config file path and override snapshot
    #[must_use]
    pub fn resolve_from(config_file: Option<&Path>, env: &EnvOverrides) -> Self {
        let mut config = Self::default();

        if let Some(path) = config_file {
            if path.exists() {
                match std::fs::read_to_string(path) {
                    Ok(raw) => config.apply_file(&raw),
                    Err(e) => warn!(
                        path = %path.display(),
                        error = %e,
                        "config file unreadable, using defaults"
                    ),
                }
            }
        }

        config.apply_env(env);
        config
    }

    /// Fold one JSON document into the configuration, field by field.
    ///
    /// Any field of the wrong shape is skipped with a warning so one bad
    /// value cannot take down the run.
    fn apply_file(&mut self, raw: &str) {
        let doc: serde_json::Value = match serde_json::from_str(raw) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "config file is not valid JSON, using defaults");
                return;
            }
        };

        match doc.get("baseUrl") {
            Some(serde_json::Value::String(url)) => self.base_url = url.clone(),
            Some(other) => warn!(value = %other, "baseUrl is not a string, keeping default"),
            None => {}
        }
        match doc.get("browser") {
            Some(serde_json::Value::String(kind)) => self.browser = BrowserKind::parse(kind),
            Some(other) => warn!(value = %other, "browser is not a string, keeping default"),
            None => {}
        }
        match doc.get("headless") {
            Some(serde_json::Value::Bool(headless)) => self.headless = *headless,
            Some(other) => warn!(value = %other, "headless is not a boolean, keeping default"),
            None => {}
        }
        if let Some(viewport) = doc.get("viewport") {
            match (
                viewport.get("width").and_then(serde_json::Value::as_u64),
                viewport.get("height").and_then(serde_json::Value::as_u64),
            ) {
                (Some(w), Some(h)) if w > 0 && h > 0 => {
                    self.viewport = Viewport {
                        width: w as u32,
                        height: h as u32,
                    };
                }
                _ => warn!("viewport is not {{width,height}} integers, keeping default"),
            }
        }
    }

    /// Apply environment overrides (highest precedence)
    fn apply_env(&mut self, env: &EnvOverrides) {
        if let Some(browser) = &env.browser {
            self.browser = BrowserKind::parse(browser);
        }
        if let Some(base_url) = &env.base_url {
            self.base_url = base_url.clone();
        }
        self.under_ci = env.ci;
        match &env.headless {
            Some(value) => self.headless = parse_bool(value),
            // CI forces headless when nothing was explicitly requested.
            None if env.ci => self.headless = true,
            None => {}
        }
        if let Some(timeout) = &env.timeout_ms {
            match timeout.trim().parse::<u64>() {
                Ok(ms) => self.default_timeout = Duration::from_millis(ms),
                Err(_) => warn!(value = %timeout, "PW_TIMEOUT is not an integer, keeping default"),
            }
        }
    }

    /// Navigation timeout: the configured default, raised to a floor that
    /// is larger under CI
    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        let floor = if self.under_ci {
            NAVIGATION_FLOOR_CI
        } else {
            NAVIGATION_FLOOR
        };
        self.default_timeout.max(floor)
    }

    /// Redirect artifact output (tests point this at a temp dir)
    #[must_use]
    pub fn with_artifact_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.artifact_root = root.into();
        self
    }

    /// Redirect the working directory for transient run files
    #[must_use]
    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env() -> EnvOverrides {
        EnvOverrides::default()
    }

    #[test]
    fn defaults_target_the_demo_storefront() {
        let config = RunConfiguration::resolve_from(None, &no_env());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.browser, BrowserKind::Chromium);
        assert!(config.headless);
        assert_eq!(config.viewport, Viewport { width: 1366, height: 768 });
        assert_eq!(config.default_timeout, Duration::from_secs(60));
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"baseUrl":"https://staging.shop.example","browser":"firefox","headless":false,"viewport":{{"width":1920,"height":1080}}}}"#
        )
        .unwrap();

        let config = RunConfiguration::resolve_from(Some(file.path()), &no_env());
        assert_eq!(config.base_url, "https://staging.shop.example");
        assert_eq!(config.browser, BrowserKind::Firefox);
        assert!(!config.headless);
        assert_eq!(config.viewport.width, 1920);
    }

    #[test]
    fn env_overrides_beat_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"browser":"firefox","baseUrl":"https://from-file.example"}}"#).unwrap();

        let env = EnvOverrides {
            browser: Some("webkit".to_string()),
            base_url: Some("https://from-env.example".to_string()),
            ..EnvOverrides::default()
        };
        let config = RunConfiguration::resolve_from(Some(file.path()), &env);
        assert_eq!(config.browser, BrowserKind::Webkit);
        assert_eq!(config.base_url, "https://from-env.example");
    }

    #[test]
    fn malformed_file_falls_back_per_field() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // headless has the wrong type; baseUrl is fine
        write!(file, r#"{{"baseUrl":"https://ok.example","headless":"nope"}}"#).unwrap();

        let config = RunConfiguration::resolve_from(Some(file.path()), &no_env());
        assert_eq!(config.base_url, "https://ok.example");
        assert!(config.headless, "unparseable field keeps its default");
    }

    #[test]
    fn unparseable_document_is_non_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json at all").unwrap();
        let config = RunConfiguration::resolve_from(Some(file.path()), &no_env());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn missing_file_is_non_fatal() {
        let config =
            RunConfiguration::resolve_from(Some(Path::new("/nonexistent/vitrina.json")), &no_env());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn headless_env_parses_permissively() {
        for value in ["1", "true", "TRUE", "True"] {
            let env = EnvOverrides {
                headless: Some(value.to_string()),
                ..EnvOverrides::default()
            };
            assert!(RunConfiguration::resolve_from(None, &env).headless, "{value}");
        }
        for value in ["0", "false", "no"] {
            let env = EnvOverrides {
                headless: Some(value.to_string()),
                ..EnvOverrides::default()
            };
            assert!(!RunConfiguration::resolve_from(None, &env).headless, "{value}");
        }
    }

    #[test]
    fn ci_forces_headless_unless_explicitly_overridden() {
        let env = EnvOverrides {
            ci: true,
            ..EnvOverrides::default()
        };
        assert!(RunConfiguration::resolve_from(None, &env).headless);

        let env = EnvOverrides {
            ci: true,
            headless: Some("false".to_string()),
            ..EnvOverrides::default()
        };
        assert!(!RunConfiguration::resolve_from(None, &env).headless);
    }

    #[test]
    fn pw_timeout_override_applies() {
        let env = EnvOverrides {
            timeout_ms: Some("30000".to_string()),
            ..EnvOverrides::default()
        };
        let config = RunConfiguration::resolve_from(None, &env);
        assert_eq!(config.default_timeout, Duration::from_millis(30_000));
    }

    #[test]
    fn navigation_timeout_respects_floor() {
        let env = EnvOverrides {
            timeout_ms: Some("10000".to_string()),
            ..EnvOverrides::default()
        };
        let config = RunConfiguration::resolve_from(None, &env);
        assert_eq!(config.navigation_timeout(), Duration::from_secs(45));

        let env = EnvOverrides {
            timeout_ms: Some("10000".to_string()),
            ci: true,
            ..EnvOverrides::default()
        };
        let config = RunConfiguration::resolve_from(None, &env);
        assert_eq!(config.navigation_timeout(), Duration::from_secs(60));

        let env = EnvOverrides {
            timeout_ms: Some("90000".to_string()),
            ..EnvOverrides::default()
        };
        let config = RunConfiguration::resolve_from(None, &env);
        assert_eq!(config.navigation_timeout(), Duration::from_millis(90_000));
    }

    #[test]
    fn browser_kind_parses_known_and_unknown() {
        assert_eq!(BrowserKind::parse("firefox"), BrowserKind::Firefox);
        assert_eq!(BrowserKind::parse("WEBKIT"), BrowserKind::Webkit);
        assert_eq!(BrowserKind::parse("chrome"), BrowserKind::Chromium);
        assert_eq!(BrowserKind::parse("netscape"), BrowserKind::Chromium);
        assert_eq!(BrowserKind::Firefox.as_str(), "firefox");
    }
}
