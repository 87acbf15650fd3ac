//! Deploy-at-end barrier
//!
//! Collects deferred requests from every participating build unit and hands
//! the whole batch to exactly one of them: the last to arrive. Appending,
//! counting and the flush decision share one critical section.

use std::sync::Mutex;

use crate::error::{RepoError, Result};
use crate::request::ChartDeploymentRequest;

/// What an arriving unit must do next
#[derive(Debug, PartialEq, Eq)]
pub enum Arrival {
    /// Other units are still on their way
    Waiting { ready: usize, total: usize },
    /// This unit arrived last and owns the drained batch
    Flush(Vec<ChartDeploymentRequest>),
}

#[derive(Debug, Default)]
struct BarrierState {
    pending: Vec<ChartDeploymentRequest>,
    ready: usize,
    flushed: bool,
}

/// Shared between all units of a run, usually behind an `Arc`
#[derive(Debug)]
pub struct DeployBarrier {
    total: usize,
    state: Mutex<BarrierState>,
}

impl DeployBarrier {
    /// Barrier for `total` participating units (at least one)
    pub fn new(total: usize) -> Self {
        Self {
            total: total.max(1),
            state: Mutex::new(BarrierState::default()),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Register one unit, optionally deferring its request
    ///
    /// Every unit arrives exactly once, whatever branch it took.
    pub fn arrive(&self, deferred: Option<ChartDeploymentRequest>) -> Result<Arrival> {
        let mut state = self.state.lock().map_err(|_| RepoError::BarrierPoisoned)?;

        if state.flushed {
            return Err(RepoError::BarrierOverflow { total: self.total });
        }

        if let Some(request) = deferred {
            state.pending.push(request);
        }
        state.ready += 1;

        if state.ready >= self.total {
            state.flushed = true;
            Ok(Arrival::Flush(std::mem::take(&mut state.pending)))
        } else {
            Ok(Arrival::Waiting {
                ready: state.ready,
                total: self.total,
            })
        }
    }

    /// Number of deferred requests not yet flushed
    pub fn pending(&self) -> usize {
        self.state.lock().map(|s| s.pending.len()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RegistryRequest;
    use helmdeploy_core::ChartIdentity;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn request(name: &str) -> ChartDeploymentRequest {
        ChartDeploymentRequest::Registry(RegistryRequest {
            chart: ChartIdentity::new(name, "1.0.0").unwrap(),
            archive: PathBuf::from(format!("{}-1.0.0.tgz", name)),
            remote: "oci://ghcr.io/org".to_string(),
            host: "ghcr.io".to_string(),
            credentials: None,
        })
    }

    #[test]
    fn test_last_arrival_flushes() {
        let barrier = DeployBarrier::new(3);
        assert_eq!(
            barrier.arrive(Some(request("a"))).unwrap(),
            Arrival::Waiting { ready: 1, total: 3 }
        );
        assert_eq!(
            barrier.arrive(None).unwrap(),
            Arrival::Waiting { ready: 2, total: 3 }
        );
        assert_eq!(barrier.pending(), 1);

        match barrier.arrive(Some(request("c"))).unwrap() {
            Arrival::Flush(batch) => {
                let names: Vec<_> = batch.iter().map(|r| r.chart().name.clone()).collect();
                assert_eq!(names, vec!["a", "c"]);
            }
            other => panic!("expected flush, got {other:?}"),
        }
        assert_eq!(barrier.pending(), 0);
    }

    #[test]
    fn test_arrival_after_flush_overflows() {
        let barrier = DeployBarrier::new(1);
        assert_eq!(barrier.arrive(None).unwrap(), Arrival::Flush(Vec::new()));
        assert!(matches!(
            barrier.arrive(Some(request("late"))),
            Err(RepoError::BarrierOverflow { total: 1 })
        ));
    }

    #[test]
    fn test_exactly_one_thread_flushes() {
        let barrier = Arc::new(DeployBarrier::new(16));
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || barrier.arrive(Some(request(&format!("c{i}")))).unwrap())
            })
            .collect();

        let flushes: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter_map(|arrival| match arrival {
                Arrival::Flush(batch) => Some(batch),
                Arrival::Waiting { .. } => None,
            })
            .collect();

        assert_eq!(flushes.len(), 1);
        assert_eq!(flushes[0].len(), 16);
    }
}
