//! Chart deployment coordinator
//!
//! Decides per invocation whether a request is skipped, deferred to the end
//! of the run or published right away, then reports the unit to the shared
//! barrier. The unit arriving last publishes every deferred request.

use helmdeploy_core::ChartIdentity;
use std::sync::Arc;

use crate::barrier::{Arrival, DeployBarrier};
use crate::error::Result;
use crate::publish::{ChartPublisher, PublishMode, PublishOutcome};
use crate::request::ChartDeploymentRequest;

/// One unit's deploy step
#[derive(Debug, Clone)]
pub struct DeployInvocation {
    pub request: ChartDeploymentRequest,
    pub skip_snapshots: bool,
    pub deploy_at_end: bool,
}

/// What happened to the invoking unit's own request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    SnapshotSkipped,
    Deferred,
    Published(PublishOutcome),
}

/// Result of one deploy invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub chart: ChartIdentity,
    pub outcome: DeployOutcome,
    /// Deferred requests this unit published as the last arrival
    pub flushed: Vec<(ChartIdentity, PublishOutcome)>,
}

/// Drives deploy invocations against a shared barrier
#[derive(Clone)]
pub struct DeployCoordinator {
    publisher: Arc<dyn ChartPublisher>,
    barrier: Arc<DeployBarrier>,
}

impl DeployCoordinator {
    pub fn new(publisher: Arc<dyn ChartPublisher>, barrier: Arc<DeployBarrier>) -> Self {
        Self { publisher, barrier }
    }

    /// Coordinator for a run with a single participating unit
    pub fn single(publisher: Arc<dyn ChartPublisher>) -> Self {
        Self::new(publisher, Arc::new(DeployBarrier::new(1)))
    }

    pub fn barrier(&self) -> &Arc<DeployBarrier> {
        &self.barrier
    }

    pub async fn deploy(&self, invocation: DeployInvocation) -> Result<DeployReport> {
        let DeployInvocation {
            request,
            skip_snapshots,
            deploy_at_end,
        } = invocation;
        let chart = request.chart().clone();

        let (outcome, deferred) = if chart.is_snapshot() && skip_snapshots && !deploy_at_end {
            tracing::info!("Skipping deployment of snapshot {}", chart);
            (Ok(DeployOutcome::SnapshotSkipped), None)
        } else if deploy_at_end {
            tracing::info!("Deferring deployment of {} to the end of the run", chart);
            (Ok(DeployOutcome::Deferred), Some(request))
        } else {
            let result = self
                .publisher
                .publish(&request, PublishMode::Immediate)
                .await
                .map(DeployOutcome::Published);
            (result, None)
        };

        // The unit arrives even when its own publish failed so the others can flush
        let flushed = match self.barrier.arrive(deferred)? {
            Arrival::Waiting { ready, total } => {
                tracing::debug!("{} of {} units ready to deploy", ready, total);
                Ok(Vec::new())
            }
            Arrival::Flush(batch) => self.flush(batch).await,
        };

        match (outcome, flushed) {
            (Ok(outcome), Ok(flushed)) => Ok(DeployReport {
                chart,
                outcome,
                flushed,
            }),
            (Err(own), Ok(_)) => Err(own),
            (Ok(_), Err(flush)) => Err(flush),
            (Err(own), Err(flush)) => {
                tracing::error!("Deferred deployment failed as well: {}", flush);
                Err(own)
            }
        }
    }

    async fn flush(&self, batch: Vec<ChartDeploymentRequest>) -> Result<Vec<(ChartIdentity, PublishOutcome)>> {
        if !batch.is_empty() {
            tracing::info!("Deploying {} deferred chart(s)", batch.len());
        }

        let mut published = Vec::with_capacity(batch.len());
        let mut remaining = batch.into_iter();
        while let Some(request) = remaining.next() {
            match self.publisher.publish(&request, PublishMode::Deferred).await {
                Ok(outcome) => published.push((request.chart().clone(), outcome)),
                Err(e) => {
                    let unpublished: Vec<String> = std::iter::once(&request)
                        .chain(remaining.as_slice())
                        .map(|r| r.chart().to_string())
                        .collect();
                    tracing::error!(
                        "Deferred deployment of {} failed, left unpublished: {}",
                        request.chart(),
                        unpublished.join(", ")
                    );
                    return Err(e);
                }
            }
        }
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepoError;
    use crate::request::RegistryRequest;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        calls: Mutex<Vec<(String, PublishMode)>>,
        fail_on: Vec<String>,
    }

    #[async_trait]
    impl ChartPublisher for RecordingPublisher {
        async fn publish(&self, request: &ChartDeploymentRequest, mode: PublishMode) -> Result<PublishOutcome> {
            let name = request.chart().to_string();
            self.calls.lock().unwrap().push((name.clone(), mode));
            if self.fail_on.contains(&name) {
                return Err(RepoError::OciPushFailed {
                    message: format!("denied {}", name),
                });
            }
            Ok(PublishOutcome::Published { location: name })
        }
    }

    fn invocation(name: &str, version: &str, skip_snapshots: bool, deploy_at_end: bool) -> DeployInvocation {
        DeployInvocation {
            request: ChartDeploymentRequest::Registry(RegistryRequest {
                chart: ChartIdentity::new(name, version).unwrap(),
                archive: PathBuf::from("unused.tgz"),
                remote: "oci://ghcr.io/org".to_string(),
                host: "ghcr.io".to_string(),
                credentials: None,
            }),
            skip_snapshots,
            deploy_at_end,
        }
    }

    #[tokio::test]
    async fn test_snapshot_skipped() {
        let publisher = Arc::new(RecordingPublisher::default());
        let coordinator = DeployCoordinator::single(publisher.clone());

        let report = coordinator
            .deploy(invocation("foo", "1.0.0-SNAPSHOT", true, false))
            .await
            .unwrap();
        assert_eq!(report.outcome, DeployOutcome::SnapshotSkipped);
        assert!(publisher.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_immediate_publish() {
        let publisher = Arc::new(RecordingPublisher::default());
        let coordinator = DeployCoordinator::single(publisher.clone());

        let report = coordinator
            .deploy(invocation("foo", "1.0.0", true, false))
            .await
            .unwrap();
        assert!(matches!(report.outcome, DeployOutcome::Published(_)));
        assert!(report.flushed.is_empty());
        assert_eq!(
            *publisher.calls.lock().unwrap(),
            vec![("foo-1.0.0".to_string(), PublishMode::Immediate)]
        );
    }

    #[tokio::test]
    async fn test_deferred_until_last_unit() {
        let publisher = Arc::new(RecordingPublisher::default());
        let coordinator = DeployCoordinator::new(publisher.clone(), Arc::new(DeployBarrier::new(3)));

        let first = coordinator.deploy(invocation("a", "1.0.0", false, true)).await.unwrap();
        assert_eq!(first.outcome, DeployOutcome::Deferred);
        // Snapshots are published at the end even with skip_snapshots
        let second = coordinator
            .deploy(invocation("b", "2.0.0-SNAPSHOT", true, true))
            .await
            .unwrap();
        assert!(second.flushed.is_empty());
        assert!(publisher.calls.lock().unwrap().is_empty());

        let last = coordinator.deploy(invocation("c", "3.0.0", false, true)).await.unwrap();
        let flushed: Vec<_> = last.flushed.iter().map(|(chart, _)| chart.to_string()).collect();
        assert_eq!(flushed, vec!["a-1.0.0", "b-2.0.0-SNAPSHOT", "c-3.0.0"]);

        let calls = publisher.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|(_, mode)| *mode == PublishMode::Deferred));
    }

    #[tokio::test]
    async fn test_failed_immediate_publish_still_arrives() {
        let publisher = Arc::new(RecordingPublisher {
            fail_on: vec!["b-1.0.0".to_string()],
            ..Default::default()
        });
        let coordinator = DeployCoordinator::new(publisher.clone(), Arc::new(DeployBarrier::new(2)));

        coordinator.deploy(invocation("a", "1.0.0", false, true)).await.unwrap();
        let err = coordinator
            .deploy(invocation("b", "1.0.0", false, false))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::OciPushFailed { .. }));

        let calls = publisher.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                ("b-1.0.0".to_string(), PublishMode::Immediate),
                ("a-1.0.0".to_string(), PublishMode::Deferred)
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_deferred_publish_stops_flush() {
        let publisher = Arc::new(RecordingPublisher {
            fail_on: vec!["b-1.0.0".to_string()],
            ..Default::default()
        });
        let coordinator = DeployCoordinator::new(publisher.clone(), Arc::new(DeployBarrier::new(3)));

        for name in ["a", "b"] {
            coordinator.deploy(invocation(name, "1.0.0", false, true)).await.unwrap();
        }
        let err = coordinator
            .deploy(invocation("c", "1.0.0", false, true))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("denied b-1.0.0"));

        let calls: Vec<_> = publisher.calls.lock().unwrap().iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(calls, vec!["a-1.0.0", "b-1.0.0"]);
    }

    #[tokio::test]
    async fn test_own_failure_wins_over_flush_failure() {
        let publisher = Arc::new(RecordingPublisher {
            fail_on: vec!["a-1.0.0".to_string(), "b-1.0.0".to_string()],
            ..Default::default()
        });
        let coordinator = DeployCoordinator::new(publisher.clone(), Arc::new(DeployBarrier::new(2)));

        coordinator.deploy(invocation("a", "1.0.0", false, true)).await.unwrap();
        let err = coordinator
            .deploy(invocation("b", "1.0.0", false, false))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("denied b-1.0.0"));
        assert_eq!(publisher.calls.lock().unwrap().len(), 2);
    }
}
