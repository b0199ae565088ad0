use anyhow::Context;
use futures::{future::BoxFuture, FutureExt};

pub mod alerts;
pub mod commands;
pub mod mappings;
pub mod repo;

/// Subdirectory of the working repository which receives generated alert files.
pub const ALERTS_SUBDIR: &str = "monitor";
/// Commit message used when publishing generated alert files.
pub const COMMIT_MESSAGE: &str = "feat: created alarms for all endpoints";

#[derive(clap::Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// URL of the service introspection endpoint listing its HTTP route mappings.
    #[clap(
        long = "mappings-url",
        env = "ENDPOINT_ALERTS_MAPPINGS_URL",
        default_value = "http://localhost:8080/actuator/mappings"
    )]
    mappings_url: url::Url,
    /// Git remote of the monitoring repository receiving generated alert files.
    #[clap(
        long = "git-remote",
        env = "ENDPOINT_ALERTS_GIT_REMOTE",
        default_value = "git@github.com:my-org/monitoring-repo.git"
    )]
    git_remote: String,
    /// Local directory holding the repository working copy.
    /// It's cloned when absent and reused as-is when present.
    #[clap(
        long = "checkout-dir",
        env = "ENDPOINT_ALERTS_CHECKOUT_DIR",
        default_value = "monitoring-repo"
    )]
    checkout_dir: std::path::PathBuf,
    /// Branch created to hold the generated alert files.
    #[clap(
        long = "branch",
        env = "ENDPOINT_ALERTS_BRANCH",
        default_value = "feature/create-alarms"
    )]
    branch: String,
    /// When running in dry-run mode, the pipeline fetches route mappings and
    /// writes alert files but merely simulates git commands without actually
    /// running them.
    #[clap(long = "dry-run")]
    dry_run: bool,
}

/// Classification of pipeline failures, one variant per stage.
/// Each wraps the underlying cause with its accumulated context.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to fetch route mappings: {0:#}")]
    Fetch(anyhow::Error),
    #[error("failed to write alert files: {0:#}")]
    Write(anyhow::Error),
    #[error("failed to prepare the repository working copy: {0:#}")]
    Repository(anyhow::Error),
    #[error("failed to create the publication branch: {0:#}")]
    Branch(anyhow::Error),
    #[error("failed to commit alert files: {0:#}")]
    Commit(anyhow::Error),
    #[error("failed to push the publication branch: {0:#}")]
    Push(anyhow::Error),
}

/// Type-erased function which GETs a URL and returns the response body.
pub type FetchFn =
    Box<dyn Fn(url::Url) -> BoxFuture<'static, anyhow::Result<Vec<u8>>> + Send + Sync>;

/// Type-erased function which runs a command under a short stream name,
/// returning its captured stdout.
pub type RunCmdFn = Box<
    dyn Fn(tokio::process::Command, &'static str) -> BoxFuture<'static, anyhow::Result<Vec<u8>>>
        + Send
        + Sync,
>;

/// Executes the fetch => checkout => generate => publish sequence.
/// Every step must complete before the next begins, and the first
/// failure stops the run.
pub struct Pipeline {
    pub mappings_url: url::Url,
    pub git_remote: String,
    pub checkout_dir: std::path::PathBuf,
    pub branch: String,
    pub fetch_fn: FetchFn,
    pub run_cmd_fn: RunCmdFn,
}

impl Pipeline {
    pub async fn run(&self) -> Result<(), PipelineError> {
        let mappings =
            mappings::fetch_route_mappings(&self.fetch_fn, self.mappings_url.clone()).await?;

        let mut checkout =
            repo::ensure_repository(&self.run_cmd_fn, &self.checkout_dir, &self.git_remote).await?;

        alerts::generate_alert_files(&mappings, &checkout.root().join(ALERTS_SUBDIR))?;

        checkout
            .publish(&self.run_cmd_fn, &self.branch, COMMIT_MESSAGE)
            .await?;

        tracing::info!(
            branch = %self.branch,
            alerts = mappings.len(),
            "published alert definitions"
        );
        Ok(())
    }
}

pub async fn run(args: Args) -> Result<(), PipelineError> {
    tracing::info!(args = ?args, "started!");

    let Args {
        mappings_url,
        git_remote,
        checkout_dir,
        branch,
        dry_run,
    } = args;

    // Build a type-erased FetchFn over a shared HTTP client.
    let fetch_fn: FetchFn = {
        let client = reqwest::Client::new();

        Box::new(move |url: url::Url| {
            let client = client.clone();
            async move {
                let response = client
                    .get(url.clone())
                    .send()
                    .await
                    .and_then(|response| response.error_for_status())
                    .with_context(|| format!("GET {url}"))?;

                let body = response
                    .bytes()
                    .await
                    .with_context(|| format!("reading response of GET {url}"))?;

                Ok(body.to_vec())
            }
            .boxed()
        })
    };

    // Build a type-erased RunCmdFn which dispatches to commands::dry_run()
    // when running in dry-run mode, or commands::run() otherwise.
    let run_cmd_fn: RunCmdFn = if dry_run {
        Box::new(move |cmd, stream| commands::dry_run(cmd, stream).boxed())
    } else {
        Box::new(move |cmd, stream| commands::run(cmd, stream).boxed())
    };

    let pipeline = Pipeline {
        mappings_url,
        git_remote,
        checkout_dir,
        branch,
        fetch_fn,
        run_cmd_fn,
    };

    pipeline.run().await
}
