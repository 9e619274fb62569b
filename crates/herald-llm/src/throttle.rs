use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::decision::{Decision, DecisionPort, DecisionRequest};
use herald_core::{HeraldError, Result};

/// Bounds the number of simultaneous decision calls across all runs sharing it.
pub struct ThrottledDecider {
    inner: Arc<dyn DecisionPort>,
    permits: Arc<Semaphore>,
    limit: usize,
}

impl ThrottledDecider {
    pub fn new(inner: Arc<dyn DecisionPort>, limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            inner,
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait]
impl DecisionPort for ThrottledDecider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn decide(&self, request: &DecisionRequest) -> Result<Decision> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| HeraldError::DecisionPort(format!("decision limiter closed: {e}")))?;
        debug!(mode = ?request.mode, available = self.permits.available_permits(), "decision permit acquired");
        self.inner.decide(request).await
    }
}
