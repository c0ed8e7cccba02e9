//! Access control policy watcher.
//!
//! # Responsibilities
//! - Poll the policy source on a fixed interval
//! - Detect changes by structural comparison with the last snapshot
//! - Fan out changed policy sets to the registered update functions
//!
//! # Design Decisions
//! - Fetch failures skip the cycle; the next tick is the retry
//! - Update failures are collected and logged as a batch, never stopping
//!   the fan-out; the snapshot advances regardless so one broken consumer
//!   cannot force redelivery on every subsequent tick
//! - A single task owns the snapshot and cycles never overlap

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::acp::schema::AcpSet;
use crate::acp::source::PolicySource;
use crate::observability::metrics;

/// Function called with the new policy set after a change.
pub type UpdateAcpFn =
    Box<dyn Fn(&AcpSet) -> Result<(), Box<dyn Error + Send + Sync>> + Send + Sync>;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Watches policy resources and calls every update function on change.
pub struct AcpWatcher {
    poll_interval: Duration,
    source: Arc<dyn PolicySource>,
    update_fns: Vec<UpdateAcpFn>,
}

impl AcpWatcher {
    /// Create a watcher with the default 30 second poll interval.
    ///
    /// The update function list is fixed for the watcher's lifetime and
    /// invoked in registration order.
    pub fn new(source: Arc<dyn PolicySource>, update_fns: Vec<UpdateAcpFn>) -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            source,
            update_fns,
        }
    }

    /// Override the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run the watcher until the shutdown signal fires.
    ///
    /// Fetch and consumer errors never terminate the loop; an in-flight
    /// cycle completes before shutdown is observed.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.poll_interval.as_secs(),
            "ACP watcher starting"
        );

        let mut ticker = time::interval(self.poll_interval);
        let mut previous: Option<AcpSet> = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll(&mut previous).await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("ACP watcher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one fetch/diff/notify cycle against the stored snapshot.
    async fn poll(&self, previous: &mut Option<AcpSet>) {
        let acps = match self.source.fetch().await {
            Ok(acps) => acps,
            Err(e) => {
                tracing::error!(error = %e, "Unable to fetch access control policies");
                metrics::record_poll(false);
                return;
            }
        };
        metrics::record_poll(true);

        if previous.as_ref() == Some(&acps) {
            return;
        }

        tracing::debug!(count = acps.len(), "Policy set changed, notifying consumers");

        let mut errs = Vec::new();
        for update in &self.update_fns {
            if let Err(e) = update(&acps) {
                errs.push(e);
            }
        }

        if !errs.is_empty() {
            let joined = errs
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            tracing::error!(
                failed = errs.len(),
                errors = %joined,
                "Unable to execute ACP update functions"
            );
        }

        metrics::record_policy_count(acps.len());
        *previous = Some(acps);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;
    use std::sync::Mutex;

    use super::*;
    use crate::acp::schema::{AcpConfig, BasicAuthConfig};
    use crate::acp::source::FetchError;

    /// Source returning a scripted sequence of fetch results, then empty
    /// sets once the script runs out.
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<AcpSet, FetchError>>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<AcpSet, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
            })
        }
    }

    #[async_trait::async_trait]
    impl PolicySource for ScriptedSource {
        async fn fetch(&self) -> Result<AcpSet, FetchError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(AcpSet::new()))
        }
    }

    /// Update function recording which consumer saw which set.
    fn recording_fn(id: usize, seen: Arc<Mutex<Vec<(usize, AcpSet)>>>) -> UpdateAcpFn {
        Box::new(move |acps| {
            seen.lock().unwrap().push((id, acps.clone()));
            Ok(())
        })
    }

    fn failing_fn(seen: Arc<Mutex<Vec<(usize, AcpSet)>>>, id: usize) -> UpdateAcpFn {
        Box::new(move |acps| {
            seen.lock().unwrap().push((id, acps.clone()));
            Err(io::Error::new(io::ErrorKind::Other, "consumer down").into())
        })
    }

    fn acp_set(names: &[&str]) -> AcpSet {
        names
            .iter()
            .map(|name| {
                let config = AcpConfig {
                    basic_auth: Some(BasicAuthConfig {
                        users: vec![format!("{}:pw", name)],
                        realm: String::new(),
                    }),
                    ..AcpConfig::default()
                };
                (name.to_string(), config)
            })
            .collect()
    }

    fn fetch_failure() -> FetchError {
        FetchError::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "down"))
    }

    #[tokio::test]
    async fn test_unchanged_set_does_not_notify() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let source = ScriptedSource::new(vec![Ok(acp_set(&["a"])), Ok(acp_set(&["a"]))]);
        let watcher = AcpWatcher::new(source, vec![recording_fn(0, seen.clone())]);

        let mut previous = None;
        watcher.poll(&mut previous).await;
        watcher.poll(&mut previous).await;

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(previous, Some(acp_set(&["a"])));
    }

    #[tokio::test]
    async fn test_changed_set_notifies_every_consumer_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let source = ScriptedSource::new(vec![Ok(acp_set(&["a"])), Ok(acp_set(&["a", "b"]))]);
        let watcher = AcpWatcher::new(
            source,
            vec![recording_fn(0, seen.clone()), recording_fn(1, seen.clone())],
        );

        let mut previous = None;
        watcher.poll(&mut previous).await;
        watcher.poll(&mut previous).await;

        let seen = seen.lock().unwrap();
        let ids: Vec<usize> = seen.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![0, 1, 0, 1]);
        assert_eq!(seen[2].1, acp_set(&["a", "b"]));
        assert_eq!(seen[3].1, acp_set(&["a", "b"]));
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_snapshot() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let source = ScriptedSource::new(vec![
            Ok(acp_set(&["a"])),
            Err(fetch_failure()),
            Ok(acp_set(&["a"])),
        ]);
        let watcher = AcpWatcher::new(source, vec![recording_fn(0, seen.clone())]);

        let mut previous = None;
        watcher.poll(&mut previous).await;
        watcher.poll(&mut previous).await;
        assert_eq!(previous, Some(acp_set(&["a"])));

        // The re-fetch of the same set after the failure is not a change.
        watcher.poll(&mut previous).await;
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_consumer_does_not_block_others() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let source = ScriptedSource::new(vec![Ok(acp_set(&["a"])), Ok(acp_set(&["a"]))]);
        let watcher = AcpWatcher::new(
            source,
            vec![failing_fn(seen.clone(), 0), recording_fn(1, seen.clone())],
        );

        let mut previous = None;
        watcher.poll(&mut previous).await;

        // Both consumers ran despite the first one failing.
        let ids: Vec<usize> = seen.lock().unwrap().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![0, 1]);

        // The snapshot advanced anyway: the same set again is no change.
        watcher.poll(&mut previous).await;
        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(previous, Some(acp_set(&["a"])));
    }

    #[tokio::test]
    async fn test_first_fetch_of_empty_set_notifies() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let source = ScriptedSource::new(vec![Ok(AcpSet::new())]);
        let watcher = AcpWatcher::new(source, vec![recording_fn(0, seen.clone())]);

        let mut previous = None;
        watcher.poll(&mut previous).await;

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(previous, Some(AcpSet::new()));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let source = ScriptedSource::new(Vec::new());
        let watcher =
            AcpWatcher::new(source, Vec::new()).with_poll_interval(Duration::from_millis(10));

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(watcher.run(rx));

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .expect("watcher did not stop on shutdown")
            .unwrap();
    }
}
