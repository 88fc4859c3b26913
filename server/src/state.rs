use std::sync::Arc;

use crate::upstream::Upstream;

#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<dyn Upstream>,
}

impl AppState {
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self { upstream }
    }
}
