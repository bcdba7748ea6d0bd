//! Polling a resource until it reaches a terminal state.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use tracing::debug;

use super::error::{CliError, CliResult};

pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const MAX_ATTEMPTS: usize = 360;
/// State that ends polling with an upstream failure.
pub const ERROR_STATE: &str = "ERROR";

/// Poll `getter(id)` until it reports `want`.
///
/// A `.` is written to `err` before every poll after the first when `ticks` is on,
/// followed by a newline once polling ends. A not-found from the getter counts as
/// success when `accept_not_found` is set.
pub async fn wait_for_terminal_state<F, Fut>(
    err: &mut (dyn Write + Send),
    ticks: bool,
    mut getter: F,
    id: &str,
    want: &str,
    accept_not_found: bool,
) -> CliResult<()>
where
    F: FnMut(String) -> Fut + Send,
    Fut: Future<Output = CliResult<String>> + Send,
{
    let mut ticked = false;
    let result = poll(err, ticks, &mut ticked, &mut getter, id, want, accept_not_found).await;
    if ticked {
        writeln!(err)?;
        err.flush()?;
    }
    result
}

async fn poll<F, Fut>(
    err: &mut (dyn Write + Send),
    ticks: bool,
    ticked: &mut bool,
    getter: &mut F,
    id: &str,
    want: &str,
    accept_not_found: bool,
) -> CliResult<()>
where
    F: FnMut(String) -> Fut + Send,
    Fut: Future<Output = CliResult<String>> + Send,
{
    for attempt in 0..MAX_ATTEMPTS {
        if attempt > 0 && ticks {
            write!(err, ".")?;
            err.flush()?;
            *ticked = true;
        }

        let state = match getter(id.to_string()).await {
            Ok(state) => state,
            Err(e) if accept_not_found && e.is_not_found() => {
                debug!(%id, "resource is gone");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        debug!(%id, %state, attempt, "polled");

        if state == ERROR_STATE {
            return Err(CliError::Upstream(format!("{id} entered state {ERROR_STATE}")));
        }
        if state == want {
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    Err(CliError::Timeout {
        id: id.to_string(),
        want: want.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    type Script = Arc<Mutex<VecDeque<CliResult<String>>>>;

    fn script(steps: Vec<CliResult<String>>) -> Script {
        Arc::new(Mutex::new(steps.into()))
    }

    async fn run(steps: Script, want: &str, accept_not_found: bool) -> (CliResult<()>, String, usize) {
        let calls = Arc::new(Mutex::new(0usize));
        let mut err: Vec<u8> = Vec::new();
        let result = {
            let calls = calls.clone();
            wait_for_terminal_state(
                &mut err,
                true,
                move |_id| {
                    let steps = steps.clone();
                    let calls = calls.clone();
                    async move {
                        *calls.lock().unwrap() += 1;
                        steps
                            .lock()
                            .unwrap()
                            .pop_front()
                            .unwrap_or_else(|| Ok("PROVISIONING".to_string()))
                    }
                },
                "pa-1",
                want,
                accept_not_found,
            )
            .await
        };
        let calls = *calls.lock().unwrap();
        (result, String::from_utf8(err).unwrap(), calls)
    }

    #[tokio::test(start_paused = true)]
    async fn reaches_wanted_state_with_ticks_between_polls() {
        let start = Instant::now();
        let steps = script(vec![Ok("PENDING".into()), Ok("PENDING".into()), Ok("ACTIVE".into())]);
        let (result, err, calls) = run(steps, "ACTIVE", false).await;
        assert!(result.is_ok());
        assert_eq!(err, "..\n");
        assert_eq!(calls, 3);
        assert_eq!(start.elapsed(), POLL_INTERVAL * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_success_writes_nothing() {
        let (result, err, calls) = run(script(vec![Ok("ACTIVE".into())]), "ACTIVE", false).await;
        assert!(result.is_ok());
        assert_eq!(err, "");
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_success_only_when_accepted() {
        let gone = || script(vec![Ok("DELETING".into()), Err(CliError::NotFound("gone".into()))]);

        let (result, err, _) = run(gone(), "DELETED", true).await;
        assert!(result.is_ok());
        assert_eq!(err, ".\n");

        let (result, _, _) = run(gone(), "DELETED", false).await;
        assert!(matches!(result, Err(CliError::NotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn error_state_is_upstream() {
        let (result, _, _) = run(script(vec![Ok("ERROR".into())]), "ACTIVE", false).await;
        assert_eq!(result.unwrap_err().to_string(), "upstream error: pa-1 entered state ERROR");
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let (result, err, calls) = run(script(vec![]), "ACTIVE", false).await;
        assert!(matches!(result, Err(CliError::Timeout { .. })));
        assert_eq!(calls, MAX_ATTEMPTS);
        assert_eq!(err.len(), MAX_ATTEMPTS);
    }
}
