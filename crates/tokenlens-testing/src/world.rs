use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::fixtures::TranscriptBuilder;

/// Temporary projects-root layout mirroring the agent's on-disk structure:
/// `<root>/<project-dir>/<session-id>.jsonl`.
pub struct ProjectsRoot {
    dir: TempDir,
}

impl ProjectsRoot {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Place a transcript under the given project directory, creating it as
    /// needed. Returns the transcript path.
    pub fn add_transcript(
        &self,
        project_dir: &str,
        session_id: &str,
        transcript: &TranscriptBuilder,
    ) -> Result<PathBuf> {
        let project = self.dir.path().join(project_dir);
        std::fs::create_dir_all(&project)?;
        let path = project.join(format!("{session_id}.jsonl"));
        transcript.write_to(&path)?;
        Ok(path)
    }
}
