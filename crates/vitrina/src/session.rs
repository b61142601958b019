//! Session lifecycle: one engine per run, one browser session per test.
//!
//! `RunContext` owns the launched engine for the whole run. Each test asks
//! it for a `Session`, drives page models against it, and hands it back
//! with a pass/fail outcome. On failure the session captures a screenshot
//! and persists its trace before closing; artifact capture is strictly
//! best-effort and never changes the reported outcome.

use crate::artifacts::{ArtifactPaths, ArtifactRecord};
use crate::capability::Automation;
use crate::config::RunConfiguration;
use crate::credentials::CredentialStore;
use crate::readiness::ReadinessProber;
use crate::result::VitrinaResult;
use async_trait::async_trait;
use tracing::{info, warn};

/// Produces browser sessions. One engine is launched per run.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Open a fresh, isolated session configured per `config`
    async fn new_session(&self, config: &RunConfiguration) -> VitrinaResult<Box<dyn Automation>>;

    /// Shut the engine down
    async fn close(&self) -> VitrinaResult<()>;
}

/// How a test ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    /// All assertions held
    Passed,
    /// An assertion or operation failed
    Failed,
}

/// Run-wide state: the engine, the resolved configuration, the prober
pub struct RunContext {
    engine: Box<dyn Engine>,
    config: RunConfiguration,
    prober: ReadinessProber,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RunContext {
    /// Wrap an already-launched engine
    #[must_use]
    pub fn new(engine: Box<dyn Engine>, config: RunConfiguration) -> Self {
        let prober = ReadinessProber::new().with_final_check(config.navigation_timeout());
        Self {
            engine,
            config,
            prober,
        }
    }

    /// The resolved run configuration
    #[must_use]
    pub fn config(&self) -> &RunConfiguration {
        &self.config
    }

    /// Credential store rooted at this run's working directory
    #[must_use]
    pub fn credential_store(&self) -> CredentialStore {
        CredentialStore::new(&self.config.workdir)
    }

    /// Open a session for one test: fresh browser context, tracing on,
    /// storefront navigated and probed ready, timeouts applied.
    ///
    /// A session that fails to open is closed before the error is
    /// returned; otherwise its browser target would linger until engine
    /// shutdown.
    pub async fn begin(&self, test_id: &str) -> VitrinaResult<Session> {
        info!(test = test_id, "opening session");
        let automation = self.engine.new_session(&self.config).await?;
        if let Err(e) = self.prepare(automation.as_ref()).await {
            if let Err(close_err) = automation.close().await {
                warn!(test = test_id, error = %close_err, "unopened session not closed");
            }
            return Err(e);
        }
        Ok(Session {
            automation,
            paths: ArtifactPaths::new(&self.config.artifact_root, test_id),
            test_id: test_id.to_string(),
        })
    }

    async fn prepare(&self, automation: &dyn Automation) -> VitrinaResult<()> {
        automation.trace_start().await?;
        self.prober
            .ensure_ready(
                automation,
                &self.config.base_url,
                self.config.navigation_timeout(),
            )
            .await?;
        automation
            .apply_timeouts(self.config.default_timeout, self.config.navigation_timeout())
            .await
    }

    /// End the run: close the engine and sweep transient run files.
    ///
    /// The credential sweep is best-effort; a leftover file only risks a
    /// stale login on the next run.
    pub async fn shutdown(self) -> VitrinaResult<()> {
        if let Err(e) = self.credential_store().cleanup() {
            warn!(error = %e, "credential sweep failed");
        }
        self.engine.close().await
    }
}

/// One test's browser session
pub struct Session {
    automation: Box<dyn Automation>,
    paths: ArtifactPaths,
    test_id: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("test_id", &self.test_id)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// The automation capability page models drive
    #[must_use]
    pub fn automation(&self) -> &dyn Automation {
        self.automation.as_ref()
    }

    /// The test this session belongs to
    #[must_use]
    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    /// Close the session, capturing failure artifacts first.
    ///
    /// On `Failed`, a screenshot and the trace are persisted to this test's
    /// artifact paths. Every capture step that fails is logged and skipped;
    /// the returned record reflects what was actually written.
    pub async fn finish(self, outcome: TestOutcome) -> VitrinaResult<ArtifactRecord> {
        let mut record = ArtifactRecord::default();

        match outcome {
            TestOutcome::Failed => {
                info!(test = %self.test_id, "test failed, capturing artifacts");
                match self.capture_screenshot().await {
                    Ok(path) => record.screenshot = Some(path),
                    Err(e) => warn!(test = %self.test_id, error = %e, "screenshot not captured"),
                }
                match self.automation.trace_stop(Some(self.paths.trace_path())).await {
                    Ok(()) => record.trace = Some(self.paths.trace_path().to_path_buf()),
                    Err(e) => warn!(test = %self.test_id, error = %e, "trace not persisted"),
                }
            }
            TestOutcome::Passed => {
                if let Err(e) = self.automation.trace_stop(None).await {
                    warn!(test = %self.test_id, error = %e, "trace not discarded cleanly");
                }
            }
        }

        self.automation.close().await?;
        Ok(record)
    }

    async fn capture_screenshot(&self) -> VitrinaResult<std::path::PathBuf> {
        let bytes = self.automation.screenshot().await?;
        let path = self.paths.screenshot_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        Ok(path.to_path_buf())
    }
}
