use crate::{PipelineError, RunCmdFn};
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Local working copy of the monitoring repository.
pub struct WorkingRepository {
    root: PathBuf,
    current_branch: Option<String>,
}

/// Returns the working copy at `local_dir`, cloning `remote` into it when
/// the directory does not yet exist. An existing directory is trusted to be
/// a previously-created clone and is not validated against `remote`.
pub async fn ensure_repository(
    run_cmd: &RunCmdFn,
    local_dir: &Path,
    remote: &str,
) -> Result<WorkingRepository, PipelineError> {
    if local_dir.exists() {
        tracing::info!(dir = %local_dir.display(), "reusing existing repository checkout");
    } else {
        let mut cmd = tokio::process::Command::new("git");
        cmd.arg("clone").arg(remote).arg(local_dir);

        (run_cmd)(cmd, "git-clone")
            .await
            .with_context(|| format!("cloning {remote}"))
            .map_err(PipelineError::Repository)?;

        tracing::info!(remote, dir = %local_dir.display(), "created repository clone");
    }

    Ok(WorkingRepository {
        root: local_dir.to_path_buf(),
        current_branch: None,
    })
}

impl WorkingRepository {
    /// Root directory of the working copy.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Branch created by `publish`, if it has run.
    pub fn current_branch(&self) -> Option<&str> {
        self.current_branch.as_deref()
    }

    /// Creates `branch`, stages all changes, commits them with `message`,
    /// and pushes the branch to `origin`. Steps run strictly in order and
    /// the first failure aborts the remainder.
    pub async fn publish(
        &mut self,
        run_cmd: &RunCmdFn,
        branch: &str,
        message: &str,
    ) -> Result<(), PipelineError> {
        let mut cmd = self.git();
        cmd.arg("checkout").arg("-b").arg(branch);
        (run_cmd)(cmd, "git-checkout")
            .await
            .with_context(|| format!("creating branch {branch}"))
            .map_err(PipelineError::Branch)?;

        self.current_branch = Some(branch.to_string());
        tracing::info!(branch, "created branch");

        let mut cmd = self.git();
        cmd.arg("add").arg("--all");
        (run_cmd)(cmd, "git-add")
            .await
            .context("staging changes")
            .map_err(PipelineError::Commit)?;

        tracing::info!("staged alert files");

        let mut cmd = self.git();
        cmd.arg("commit").arg("-m").arg(message);
        (run_cmd)(cmd, "git-commit")
            .await
            .context("committing staged changes")
            .map_err(PipelineError::Commit)?;

        // Read back the committed revision so the log carries it.
        // In dry-run mode the output is empty.
        let mut cmd = self.git();
        cmd.arg("rev-parse").arg("HEAD");
        let output = (run_cmd)(cmd, "git-rev-parse")
            .await
            .context("reading the committed revision")
            .map_err(PipelineError::Commit)?;

        let revision = String::from_utf8_lossy(&output);
        tracing::info!(revision = revision.trim(), "committed alert files");

        let mut cmd = self.git();
        cmd.arg("push").arg("origin").arg(branch);
        (run_cmd)(cmd, "git-push")
            .await
            .with_context(|| format!("pushing branch {branch}"))
            .map_err(PipelineError::Push)?;

        tracing::info!(branch, "pushed branch to origin");

        Ok(())
    }

    fn git(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new("git");
        cmd.current_dir(&self.root);
        cmd
    }
}
