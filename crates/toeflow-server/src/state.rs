use std::sync::Arc;

use toeflow_review::Workflow;

/// Shared application state.
pub struct AppState<S> {
    pub workflow: Arc<Workflow<S>>,
}

impl<S> AppState<S> {
    pub fn new(workflow: Arc<Workflow<S>>) -> Self {
        Self { workflow }
    }
}

// Manual impl: the store itself need not be `Clone`.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            workflow: Arc::clone(&self.workflow),
        }
    }
}
