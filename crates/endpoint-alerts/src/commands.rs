use anyhow::Context;
use std::ffi::OsStr;

/// Runs `cmd` to completion under the short `stream` name, returning its
/// captured stdout. Stderr is logged at debug level, and a non-zero exit
/// becomes an error carrying the exit status and stderr.
pub async fn run(mut cmd: tokio::process::Command, stream: &'static str) -> anyhow::Result<Vec<u8>> {
    tracing::debug!(stream, cmd = %render_cmd(&cmd), "running command");

    let output = cmd
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("failed to spawn {stream}"))?;

    for line in String::from_utf8_lossy(&output.stderr).lines() {
        tracing::debug!(stream, "{line}");
    }

    if !output.status.success() {
        anyhow::bail!(
            "{stream} failed ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim_end()
        );
    }

    Ok(output.stdout)
}

/// Logs the command which would have run, without running it.
/// Always succeeds with empty output.
pub async fn dry_run(cmd: tokio::process::Command, stream: &'static str) -> anyhow::Result<Vec<u8>> {
    tracing::info!(stream, cmd = %render_cmd(&cmd), "dry-run of command");

    Ok(Vec::new())
}

/// Program and arguments of `cmd`, in invocation order.
pub fn args(cmd: &tokio::process::Command) -> impl Iterator<Item = &OsStr> {
    let inner = cmd.as_std();
    std::iter::once(inner.get_program()).chain(inner.get_args())
}

/// True if the program and leading arguments of `cmd` equal `prefix`.
pub fn starts_with(cmd: &tokio::process::Command, prefix: &[&str]) -> bool {
    args(cmd)
        .take(prefix.len())
        .eq(prefix.iter().map(OsStr::new))
}

// Not named `display`: tracing's value macros import `tracing::field::display`
// into their expansion, which would shadow an unqualified call here.
fn render_cmd(cmd: &tokio::process::Command) -> String {
    args(cmd)
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod test {
    use super::*;

    fn git(arguments: &[&str]) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new("git");
        cmd.args(arguments);
        cmd
    }

    #[test]
    fn test_args_lists_program_then_arguments() {
        let cmd = git(&["push", "origin", "feature/create-alarms"]);
        let actual: Vec<_> = args(&cmd)
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();

        assert_eq!(actual, vec!["git", "push", "origin", "feature/create-alarms"]);
    }

    #[test]
    fn test_starts_with_matches_leading_arguments() {
        let cmd = git(&["rev-parse", "HEAD"]);

        assert!(starts_with(&cmd, &["git", "rev-parse"]));
        assert!(starts_with(&cmd, &["git", "rev-parse", "HEAD"]));
        assert!(!starts_with(&cmd, &["git", "commit"]));
        assert!(!starts_with(&cmd, &["git", "rev-parse", "HEAD", "--short"]));
    }

    #[test]
    fn test_render_cmd_joins_program_and_arguments() {
        let cmd = git(&["push", "origin", "feature/create-alarms"]);
        assert_eq!(render_cmd(&cmd), "git push origin feature/create-alarms");
    }

    #[tokio::test]
    async fn test_dry_run_returns_empty_output() {
        let output = dry_run(git(&["push"]), "git-push").await.unwrap();
        assert!(output.is_empty());
    }
}
