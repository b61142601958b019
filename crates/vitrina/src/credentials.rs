//! Credential hand-off between scenarios.
//!
//! Registration scenarios persist the account they created as
//! `lastUser_<timestamp>.json` in the working directory; login scenarios
//! pick up the most recent one instead of re-registering. The files are
//! transient run state and are swept at shutdown.

use crate::result::{VitrinaError, VitrinaResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Filename prefix for persisted accounts
const FILE_PREFIX: &str = "lastUser_";

/// Password used for every generated account. The demo storefront enforces
/// a complexity policy; this satisfies it.
pub const GENERATED_PASSWORD: &str = "Str0ng!Passw0rd#2024";

/// Generate a unique throwaway email for registration
#[must_use]
pub fn unique_email() -> String {
    format!("vitrina.{}@example.com", Utc::now().format("%Y%m%d%H%M%S%3f"))
}

/// A registered storefront account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Fresh credentials with a unique email and the generated password
    #[must_use]
    pub fn generate() -> Self {
        Self {
            email: unique_email(),
            password: GENERATED_PASSWORD.to_string(),
        }
    }
}

/// File-based store for the credential hand-off
#[derive(Debug, Clone)]
pub struct CredentialStore {
    workdir: PathBuf,
}

impl CredentialStore {
    /// Store rooted at `workdir`
    #[must_use]
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Persist `credentials` as a new timestamped file, returning its path
    pub fn save(&self, credentials: &Credentials) -> VitrinaResult<PathBuf> {
        std::fs::create_dir_all(&self.workdir)?;
        let stamp = Utc::now().format("%Y%m%d%H%M%S");
        let path = self.workdir.join(format!("{FILE_PREFIX}{stamp}.json"));
        std::fs::write(&path, serde_json::to_vec_pretty(credentials)?)?;
        debug!(path = %path.display(), "saved credentials");
        Ok(path)
    }

    /// Load the most recently saved credentials.
    ///
    /// "Most recent" is decided by filename; the timestamp format sorts
    /// lexicographically. Errors if no credential file exists.
    pub fn load_latest(&self) -> VitrinaResult<Credentials> {
        let latest = self
            .credential_files()?
            .into_iter()
            .max()
            .ok_or_else(|| VitrinaError::Credentials {
                message: format!(
                    "no {FILE_PREFIX}*.json in {}; run a registration scenario first",
                    self.workdir.display()
                ),
            })?;
        let raw = std::fs::read_to_string(&latest)?;
        serde_json::from_str(&raw).map_err(|e| VitrinaError::Credentials {
            message: format!("{} is not a credential file: {e}", latest.display()),
        })
    }

    /// Remove every credential file, returning how many were removed
    pub fn cleanup(&self) -> VitrinaResult<usize> {
        let files = self.credential_files()?;
        let mut removed = 0;
        for path in files {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "credential file not removed"),
            }
        }
        Ok(removed)
    }

    fn credential_files(&self) -> VitrinaResult<Vec<PathBuf>> {
        if !self.workdir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.workdir)? {
            let path = entry?.path();
            if is_credential_file(&path) {
                files.push(path);
            }
        }
        Ok(files)
    }
}

fn is_credential_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(FILE_PREFIX) && n.ends_with(".json"))
}
