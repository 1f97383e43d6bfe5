/*!
 * Job artifact layout and writers.
 *
 * Every artifact is written atomically, so an interrupted job leaves either
 * the previous file or the complete new one.
 */

use anyhow::Result;
use log::debug;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::file_utils::FileManager;

/// Paths of a job's artifacts, relative to the job directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    root: PathBuf,
}

impl ArtifactPaths {
    pub const SNAPSHOT: &'static str = "glossary/snapshot.json";
    pub const BIAS_TERMS: &'static str = "glossary/bias_terms.json";
    pub const ROUTING_DECISIONS: &'static str = "translation/routing_decisions.json";
    pub const QUALITY_REPORT: &'static str = "translation/quality_report.json";

    pub fn new<P: AsRef<Path>>(job_dir: P) -> Self {
        Self {
            root: job_dir.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot(&self) -> PathBuf {
        self.root.join(Self::SNAPSHOT)
    }

    pub fn bias_terms(&self) -> PathBuf {
        self.root.join(Self::BIAS_TERMS)
    }

    pub fn routing_decisions(&self) -> PathBuf {
        self.root.join(Self::ROUTING_DECISIONS)
    }

    pub fn quality_report(&self) -> PathBuf {
        self.root.join(Self::QUALITY_REPORT)
    }

    /// Write one JSON artifact atomically
    pub fn write<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        FileManager::write_json_atomic(path, value)?;
        debug!("Wrote artifact {:?}", path);
        Ok(())
    }
}
