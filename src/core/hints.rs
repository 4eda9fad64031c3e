//! Purpose: Load persisted module-identifier hints for the resolver fast path.
//! Exports: `HintMap`.
//! Role: Consumption side of the offline discovery tooling's output file.
//! Invariants: Absent files, malformed entries, and foreign-version entries
//! degrade to full-scan resolution with a logged warning, never a hard failure.
//! Invariants: Only entries recorded for the running host version produce hints.

use std::collections::HashMap;
use std::path::Path;

use crate::core::error::{Error, ErrorKind};
use crate::core::fingerprint::Fingerprint;
use crate::core::graph::ModuleId;

/// Flat `logicalName → "<hostVersion>:<identifier>"` map, filtered at load
/// time down to the identifiers recorded for the running host version.
#[derive(Debug)]
pub struct HintMap {
    host_version: String,
    hints: HashMap<String, ModuleId>,
}

impl HintMap {
    pub fn empty(host_version: impl Into<String>) -> Self {
        Self {
            host_version: host_version.into(),
            hints: HashMap::new(),
        }
    }

    /// Load the hint file. A missing file is an empty map; unreadable or
    /// unparseable files are errors for callers that want to distinguish
    /// them (`load_or_empty` is the degrading variant).
    pub fn load(path: &Path, host_version: impl Into<String>) -> Result<Self, Error> {
        let host_version = host_version.into();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no hint file; full scans only");
                return Ok(Self::empty(host_version));
            }
            Err(err) => {
                return Err(Error::new(ErrorKind::Io)
                    .with_message("failed to read hint file")
                    .with_source(err));
            }
        };

        let entries: HashMap<String, String> = serde_json::from_str(&raw).map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message("hint file is not a flat string map")
                .with_source(err)
        })?;

        let mut hints = HashMap::new();
        let mut stale = 0usize;
        for (name, entry) in entries {
            let Some((version, id)) = entry.split_once(':') else {
                tracing::warn!(name = %name, entry = %entry, "malformed hint entry skipped");
                continue;
            };
            if version.is_empty() || id.is_empty() {
                tracing::warn!(name = %name, entry = %entry, "malformed hint entry skipped");
                continue;
            }
            if version != host_version {
                stale += 1;
                continue;
            }
            hints.insert(name, ModuleId::new(id));
        }
        if stale > 0 {
            tracing::debug!(stale, "hint entries for other host versions ignored");
        }

        Ok(Self {
            host_version,
            hints,
        })
    }

    /// Degrading load: any failure becomes an empty map with a warning,
    /// since hints are an optimization the session can live without.
    pub fn load_or_empty(path: &Path, host_version: impl Into<String>) -> Self {
        let host_version = host_version.into();
        match Self::load(path, host_version.clone()) {
            Ok(map) => map,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "hint file unusable; falling back to full scans"
                );
                Self::empty(host_version)
            }
        }
    }

    pub fn host_version(&self) -> &str {
        &self.host_version
    }

    pub fn hint_for(&self, name: &str) -> Option<&ModuleId> {
        self.hints.get(name)
    }

    /// Attach the hint recorded for `name`, when one exists.
    pub fn apply(&self, name: &str, mut fingerprint: Fingerprint) -> Fingerprint {
        fingerprint.set_hint(self.hints.get(name).cloned());
        fingerprint
    }

    pub fn len(&self) -> usize {
        self.hints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }
}
