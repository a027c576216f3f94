//! Poll-until-stable state convergence
//!
//! Cloud APIs acknowledge a mutating call long before the object settles.
//! `converge` repeatedly describes the object behind a handle until its
//! status enters the target set, classifying every observation as done,
//! still pending, or fatal:
//!
//! - a describe error is fatal and returned as `Transport`
//! - "not found" is success for deletes and `ResourceDisappeared` otherwise
//! - a status in neither set is `UnexpectedState` and is never retried
//! - pending statuses sleep one interval and fail with `Timeout` once the
//!   elapsed time reaches the timeout
//!
//! Retrying transient transport failures is the describer's job, not ours.

use crate::context::Context;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Poll interval used when a spec does not set one
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// What a "not found" observation means for the wait in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundPolicy {
    /// The object going away is the goal (delete)
    Succeed,
    /// The object vanished while we expected it to settle (create/update)
    Fail,
}

#[derive(Debug, Clone)]
pub struct PollSpec {
    /// Non-terminal statuses; empty means anything outside `target`
    pub pending: HashSet<String>,
    pub target: HashSet<String>,
    pub timeout: Duration,
    pub interval: Duration,
    pub not_found: NotFoundPolicy,
}

fn to_set(statuses: &[&str]) -> HashSet<String> {
    statuses.iter().map(|s| s.to_string()).collect()
}

impl PollSpec {
    pub fn new(
        pending: &[&str],
        target: &[&str],
        timeout: Duration,
        not_found: NotFoundPolicy,
    ) -> Self {
        Self {
            pending: to_set(pending),
            target: to_set(target),
            timeout,
            interval: DEFAULT_INTERVAL,
            not_found,
        }
    }

    pub fn for_create(pending: &[&str], target: &[&str], timeout: Duration) -> Self {
        Self::new(pending, target, timeout, NotFoundPolicy::Fail)
    }

    pub fn for_update(pending: &[&str], target: &[&str], timeout: Duration) -> Self {
        Self::new(pending, target, timeout, NotFoundPolicy::Fail)
    }

    /// Wait for the object to disappear; `pending` lists the tear-down statuses
    pub fn for_delete(pending: &[&str], timeout: Duration) -> Self {
        Self::new(pending, &[], timeout, NotFoundPolicy::Succeed)
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.timeout.is_zero() {
            return Err("timeout must be greater than zero".to_string());
        }
        if self.interval.is_zero() {
            return Err("interval must be greater than zero".to_string());
        }
        let mut overlap: Vec<&String> = self.pending.intersection(&self.target).collect();
        if !overlap.is_empty() {
            overlap.sort();
            return Err(format!(
                "pending and target statuses overlap: {:?}",
                overlap
            ));
        }
        Ok(())
    }

    fn is_pending(&self, status: &str) -> bool {
        if self.pending.is_empty() {
            !self.target.contains(status)
        } else {
            self.pending.contains(status)
        }
    }
}

/// One describe result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Status(String),
    NotFound,
}

impl Observation {
    pub fn status(status: impl Into<String>) -> Self {
        Observation::Status(status.into())
    }
}

impl From<Option<String>> for Observation {
    fn from(status: Option<String>) -> Self {
        match status {
            Some(status) => Observation::Status(status),
            None => Observation::NotFound,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConvergeError<E> {
    #[error("transport error: {0}")]
    Transport(#[source] E),

    #[error("resource {handle} disappeared while waiting for it to become ready")]
    ResourceDisappeared { handle: String },

    #[error("timeout after {elapsed:?} waiting for {handle}, last status {last_status:?}")]
    Timeout {
        handle: String,
        last_status: String,
        elapsed: Duration,
    },

    #[error("resource {handle} reached unexpected status {status:?}")]
    UnexpectedState { handle: String, status: String },

    #[error("invalid poll spec: {0}")]
    InvalidSpec(String),
}

impl<E> ConvergeError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ConvergeError::Timeout { .. })
    }

    pub fn map_transport<F>(self, f: impl FnOnce(E) -> F) -> ConvergeError<F> {
        match self {
            ConvergeError::Transport(e) => ConvergeError::Transport(f(e)),
            ConvergeError::ResourceDisappeared { handle } => {
                ConvergeError::ResourceDisappeared { handle }
            }
            ConvergeError::Timeout {
                handle,
                last_status,
                elapsed,
            } => ConvergeError::Timeout {
                handle,
                last_status,
                elapsed,
            },
            ConvergeError::UnexpectedState { handle, status } => {
                ConvergeError::UnexpectedState { handle, status }
            }
            ConvergeError::InvalidSpec(msg) => ConvergeError::InvalidSpec(msg),
        }
    }
}

/// Poll `describe(handle)` until the status converges according to `spec`
///
/// The effective timeout is the smaller of `spec.timeout` and the time left
/// on the context deadline.
pub async fn converge<F, Fut, E>(
    ctx: &Context,
    handle: &str,
    spec: &PollSpec,
    mut describe: F,
) -> Result<(), ConvergeError<E>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Observation, E>>,
{
    if handle.is_empty() {
        return Err(ConvergeError::InvalidSpec(
            "handle must not be empty".to_string(),
        ));
    }
    spec.validate().map_err(ConvergeError::InvalidSpec)?;

    let timeout = match ctx.remaining() {
        Some(left) if left < spec.timeout => left,
        _ => spec.timeout,
    };

    let start = Instant::now();
    let mut polls: u32 = 0;

    loop {
        polls += 1;
        let observation = describe(handle.to_string())
            .await
            .map_err(ConvergeError::Transport)?;

        let status = match observation {
            Observation::NotFound => {
                return match spec.not_found {
                    NotFoundPolicy::Succeed => {
                        debug!(log_id = ctx.log_id(), handle, polls, "resource is gone");
                        Ok(())
                    }
                    NotFoundPolicy::Fail => {
                        warn!(log_id = ctx.log_id(), handle, polls, "resource disappeared");
                        Err(ConvergeError::ResourceDisappeared {
                            handle: handle.to_string(),
                        })
                    }
                };
            }
            Observation::Status(status) => status,
        };

        if spec.target.contains(&status) {
            debug!(log_id = ctx.log_id(), handle, status = %status, polls, "converged");
            return Ok(());
        }

        if !spec.is_pending(&status) {
            warn!(
                log_id = ctx.log_id(),
                handle,
                status = %status,
                "unexpected status while converging"
            );
            return Err(ConvergeError::UnexpectedState {
                handle: handle.to_string(),
                status,
            });
        }

        debug!(log_id = ctx.log_id(), handle, status = %status, polls, "still pending");
        sleep(spec.interval).await;

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            warn!(
                log_id = ctx.log_id(),
                handle,
                last_status = %status,
                elapsed_ms = elapsed.as_millis() as u64,
                "timed out waiting for status"
            );
            return Err(ConvergeError::Timeout {
                handle: handle.to_string(),
                last_status: status,
                elapsed,
            });
        }
    }
}

/// A reusable poll policy for one kind of remote object
#[derive(Debug, Clone)]
pub struct StateConverger {
    spec: PollSpec,
}

impl StateConverger {
    pub fn new(spec: PollSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &PollSpec {
        &self.spec
    }

    pub async fn wait<F, Fut, E>(
        &self,
        ctx: &Context,
        handle: &str,
        describe: F,
    ) -> Result<(), ConvergeError<E>>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<Observation, E>>,
    {
        converge(ctx, handle, &self.spec, describe).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, thiserror::Error)]
    #[error("connection reset")]
    struct ConnectionReset;

    /// Describer that replays `script` and repeats its last entry
    fn scripted(
        script: Vec<Observation>,
        calls: Arc<AtomicUsize>,
    ) -> impl FnMut(String) -> std::future::Ready<Result<Observation, ConnectionReset>> {
        move |_handle| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            let idx = n.min(script.len() - 1);
            std::future::ready(Ok(script[idx].clone()))
        }
    }

    fn statuses(list: &[&str]) -> Vec<Observation> {
        list.iter().map(|s| Observation::status(*s)).collect()
    }

    fn tse_create_spec() -> PollSpec {
        PollSpec::for_create(
            &["creating", "restarting"],
            &["running"],
            Duration::from_secs(300),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn target_on_first_observation_returns_after_one_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let start = Instant::now();

        let result = converge(
            &Context::new(),
            "ins-1",
            &tse_create_spec(),
            scripted(statuses(&["running"]), calls.clone()),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_then_target_sleeps_once_per_pending() {
        for n in 0..5usize {
            let calls = Arc::new(AtomicUsize::new(0));
            let mut script = vec![Observation::status("creating"); n];
            script.push(Observation::status("running"));
            let start = Instant::now();

            let result = converge(
                &Context::new(),
                "ins-1",
                &tse_create_spec(),
                scripted(script, calls.clone()),
            )
            .await;

            assert!(result.is_ok());
            assert_eq!(calls.load(Ordering::SeqCst), n + 1);
            let elapsed = start.elapsed();
            assert!(elapsed >= Duration::from_secs(n as u64));
            assert!(elapsed < Duration::from_secs(n as u64 + 1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_creating_creating_running() {
        let calls = Arc::new(AtomicUsize::new(0));
        let start = Instant::now();

        let result = converge(
            &Context::new(),
            "ins-1",
            &tse_create_spec(),
            scripted(
                statuses(&["creating", "creating", "running"]),
                calls.clone(),
            ),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_creating_forever_times_out() {
        let calls = Arc::new(AtomicUsize::new(0));

        let err = converge(
            &Context::new(),
            "ins-1",
            &tse_create_spec(),
            scripted(statuses(&["creating"]), calls.clone()),
        )
        .await
        .unwrap_err();

        match err {
            ConvergeError::Timeout {
                handle,
                last_status,
                elapsed,
            } => {
                assert_eq!(handle, "ins-1");
                assert_eq!(last_status, "creating");
                assert!(elapsed >= Duration::from_secs(300));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 300);
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_create_failed_is_unexpected() {
        let calls = Arc::new(AtomicUsize::new(0));

        let err = converge(
            &Context::new(),
            "ins-1",
            &tse_create_spec(),
            scripted(statuses(&["create_failed", "running"]), calls.clone()),
        )
        .await
        .unwrap_err();

        match err {
            ConvergeError::UnexpectedState { status, .. } => assert_eq!(status, "create_failed"),
            other => panic!("expected unexpected state, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_not_found_succeeds_at_any_point() {
        for pending_before in 0..3usize {
            let calls = Arc::new(AtomicUsize::new(0));
            let mut script = vec![Observation::status("destroying"); pending_before];
            script.push(Observation::NotFound);

            let result = converge(
                &Context::new(),
                "ins-1",
                &PollSpec::for_delete(&["destroying"], Duration::from_secs(300)),
                scripted(script, calls.clone()),
            )
            .await;

            assert!(result.is_ok());
            assert_eq!(calls.load(Ordering::SeqCst), pending_before + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn create_not_found_is_resource_disappeared() {
        let calls = Arc::new(AtomicUsize::new(0));

        let err = converge(
            &Context::new(),
            "ins-1",
            &tse_create_spec(),
            scripted(
                vec![Observation::status("creating"), Observation::NotFound],
                calls.clone(),
            ),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ConvergeError::ResourceDisappeared { ref handle } if handle == "ins-1"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_is_returned_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let err = converge(&Context::new(), "ins-1", &tse_create_spec(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<Observation, _>(ConnectionReset) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ConvergeError::Transport(ConnectionReset)));
        assert_eq!(err.to_string(), "transport error: connection reset");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_pending_treats_everything_but_target_as_pending() {
        let calls = Arc::new(AtomicUsize::new(0));
        let spec = PollSpec::for_create(&[], &["SUCCESS"], Duration::from_secs(60));

        let result = converge(
            &Context::new(),
            "task-1",
            &spec,
            scripted(statuses(&["RUNNING", "QUEUED", "SUCCESS"]), calls.clone()),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn describer_receives_the_handle() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        converge(
            &Context::new(),
            "gateway-1#group-2",
            &tse_create_spec(),
            move |handle| {
                sink.lock().unwrap().push(handle);
                async { Ok::<_, ConnectionReset>(Observation::status("running")) }
            },
        )
        .await
        .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["gateway-1#group-2".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_specs_never_call_describer() {
        let overlapping =
            PollSpec::for_create(&["running"], &["running"], Duration::from_secs(10));
        let zero_timeout = tse_create_spec().with_timeout(Duration::ZERO);
        let zero_interval = tse_create_spec().with_interval(Duration::ZERO);

        for (handle, spec) in [
            ("ins-1", overlapping),
            ("ins-1", zero_timeout),
            ("ins-1", zero_interval),
            ("", tse_create_spec()),
        ] {
            let calls = Arc::new(AtomicUsize::new(0));
            let err = converge(
                &Context::new(),
                handle,
                &spec,
                scripted(statuses(&["running"]), calls.clone()),
            )
            .await
            .unwrap_err();

            assert!(matches!(err, ConvergeError::InvalidSpec(_)));
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn context_deadline_caps_timeout() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ctx = Context::new().with_timeout(Duration::from_secs(10));

        let err = converge(
            &ctx,
            "ins-1",
            &tse_create_spec(),
            scripted(statuses(&["creating"]), calls.clone()),
        )
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_interval_is_respected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let spec = tse_create_spec().with_interval(Duration::from_secs(5));
        let start = Instant::now();

        converge(
            &Context::new(),
            "ins-1",
            &spec,
            scripted(statuses(&["creating", "restarting", "running"]), calls),
        )
        .await
        .unwrap();

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(10) && elapsed < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn state_converger_reuses_its_spec() {
        let converger = StateConverger::new(
            PollSpec::for_delete(&["Deleting"], Duration::from_secs(30))
                .with_interval(Duration::from_millis(500)),
        );
        assert_eq!(converger.spec().not_found, NotFoundPolicy::Succeed);

        for handle in ["gateway-a", "gateway-b"] {
            let calls = Arc::new(AtomicUsize::new(0));
            converger
                .wait(
                    &Context::new(),
                    handle,
                    scripted(
                        vec![Observation::status("Deleting"), Observation::NotFound],
                        calls.clone(),
                    ),
                )
                .await
                .unwrap();
            assert_eq!(calls.load(Ordering::SeqCst), 2);
        }
    }

    #[test]
    fn observation_from_option() {
        assert_eq!(
            Observation::from(Some("running".to_string())),
            Observation::status("running")
        );
        assert_eq!(Observation::from(None), Observation::NotFound);
    }

    #[test]
    fn map_transport_keeps_other_variants() {
        let err: ConvergeError<ConnectionReset> = ConvergeError::UnexpectedState {
            handle: "ins-1".to_string(),
            status: "FAILED".to_string(),
        };
        let mapped: ConvergeError<String> = err.map_transport(|e| e.to_string());
        assert!(matches!(mapped, ConvergeError::UnexpectedState { .. }));

        let err: ConvergeError<ConnectionReset> = ConvergeError::Transport(ConnectionReset);
        let mapped = err.map_transport(|e| e.to_string());
        assert!(matches!(mapped, ConvergeError::Transport(ref s) if s == "connection reset"));
    }
}
