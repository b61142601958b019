//! Failure artifact layout.
//!
//! Screenshots land under `<root>/screenshots/<test-id>.png` and traces
//! under `<root>/traces/<test-id>.zip`. Test identifiers are sanitized so
//! parameterized names with spaces or slashes stay valid filenames.

use std::path::{Path, PathBuf};

/// Replace every character outside `[A-Za-z0-9._-]` with an underscore
#[must_use]
pub fn sanitize_test_id(test_id: &str) -> String {
    test_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Artifact destinations for one test, derived from its identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    screenshot: PathBuf,
    trace: PathBuf,
}

impl ArtifactPaths {
    /// Derive paths for `test_id` under `root`
    #[must_use]
    pub fn new(root: &Path, test_id: &str) -> Self {
        let id = sanitize_test_id(test_id);
        Self {
            screenshot: root.join("screenshots").join(format!("{id}.png")),
            trace: root.join("traces").join(format!("{id}.zip")),
        }
    }

    /// Where the failure screenshot is written
    #[must_use]
    pub fn screenshot_path(&self) -> &Path {
        &self.screenshot
    }

    /// Where the trace archive is written
    #[must_use]
    pub fn trace_path(&self) -> &Path {
        &self.trace
    }
}

/// What a finished session actually persisted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactRecord {
    /// Screenshot file, if one was captured and written
    pub screenshot: Option<PathBuf>,
    /// Trace file, if one was persisted
    pub trace: Option<PathBuf>,
}
