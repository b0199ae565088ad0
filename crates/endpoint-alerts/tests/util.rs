use endpoint_alerts::{commands, FetchFn, RunCmdFn};
use futures::future::BoxFuture;
use futures::FutureExt;
use itertools::Itertools;
use std::sync::{Arc, Mutex};

/// Recorded interaction with a mocked capability.
#[derive(Debug, PartialEq)]
pub enum TraceEntry {
    Fetch(String),
    Cmd(&'static str, String),
}

// Revision returned by the mocked `git rev-parse HEAD`.
const FIXTURE_REVISION: &[u8] = b"b6589fc6ab0dc82cf12099d1c2d40ab994e8410c\n";

pub fn mock_fetch_fn(trace: Arc<Mutex<Vec<TraceEntry>>>, body: &'static [u8]) -> FetchFn {
    Box::new(
        move |url| -> BoxFuture<'static, anyhow::Result<Vec<u8>>> {
            trace.lock().unwrap().push(TraceEntry::Fetch(url.to_string()));

            futures::future::ready(Ok(body.to_vec())).boxed()
        },
    )
}

pub fn failing_fetch_fn(trace: Arc<Mutex<Vec<TraceEntry>>>) -> FetchFn {
    Box::new(
        move |url| -> BoxFuture<'static, anyhow::Result<Vec<u8>>> {
            trace.lock().unwrap().push(TraceEntry::Fetch(url.to_string()));

            futures::future::ready(Err(anyhow::anyhow!("GET {url}: connection refused"))).boxed()
        },
    )
}

pub fn mock_run_cmd_fn(trace: Arc<Mutex<Vec<TraceEntry>>>) -> RunCmdFn {
    Box::new(
        move |cmd, stream| -> BoxFuture<'static, anyhow::Result<Vec<u8>>> {
            trace.lock().unwrap().push(TraceEntry::Cmd(
                stream,
                commands::args(&cmd).map(|s| s.to_string_lossy()).join(" "),
            ));
            let mut output = Vec::new();

            // Publication reads back the revision it just committed.
            if commands::starts_with(&cmd, &["git", "rev-parse"]) {
                output = FIXTURE_REVISION.to_vec();
            }

            futures::future::ready(Ok(output)).boxed()
        },
    )
}

/// A RunCmdFn whose commands succeed except those matching `fail_prefix`,
/// which fail the way a non-zero git exit does. Lets a test drive one
/// pipeline stage into its error path.
pub fn failing_run_cmd_fn(
    trace: Arc<Mutex<Vec<TraceEntry>>>,
    fail_prefix: &'static [&'static str],
) -> RunCmdFn {
    Box::new(
        move |cmd, stream| -> BoxFuture<'static, anyhow::Result<Vec<u8>>> {
            trace.lock().unwrap().push(TraceEntry::Cmd(
                stream,
                commands::args(&cmd).map(|s| s.to_string_lossy()).join(" "),
            ));

            if commands::starts_with(&cmd, fail_prefix) {
                return futures::future::ready(Err(anyhow::anyhow!(
                    "{stream} failed (exit status: 1): simulated git failure"
                )))
                .boxed();
            }

            futures::future::ready(Ok(Vec::new())).boxed()
        },
    )
}
