use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;

use super::NodeId;

/// Notified of every hop through the graph. Used for visualization only.
pub trait RouteObserver: Send + Sync {
    fn on_route(&self, from: NodeId, to: NodeId);
}

impl<F> RouteObserver for F
where
    F: Fn(NodeId, NodeId) + Send + Sync,
{
    fn on_route(&self, from: NodeId, to: NodeId) {
        self(from, to)
    }
}

/// Records hops in order.
#[derive(Debug, Clone, Default)]
pub struct RouteRecorder {
    hops: Arc<Mutex<Vec<(NodeId, NodeId)>>>,
}

impl RouteRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hops(&self) -> Vec<(NodeId, NodeId)> {
        self.hops.lock().clone()
    }

    pub fn clear(&self) {
        self.hops.lock().clear();
    }
}

impl RouteObserver for RouteRecorder {
    fn on_route(&self, from: NodeId, to: NodeId) {
        self.hops.lock().push((from, to));
    }
}

/// A panicking observer is logged and skipped.
pub(crate) fn notify(observers: &[Arc<dyn RouteObserver>], from: NodeId, to: NodeId) {
    for observer in observers {
        let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_route(from, to)));
        if outcome.is_err() {
            tracing::warn!(%from, %to, "Route observer panicked");
        }
    }
}
