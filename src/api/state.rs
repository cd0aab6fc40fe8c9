use std::sync::Arc;

use crate::{
    db::RecommendationStore,
    error::{AppError, AppResult},
    services::{Catalog, Scorer, ScorerProvider},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub scorer: Arc<ScorerProvider>,
    pub store: Option<Arc<dyn RecommendationStore>>,
}

impl AppState {
    /// Creates state without recommendation history
    pub fn new(scorer: Arc<ScorerProvider>) -> Self {
        Self {
            scorer,
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn RecommendationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// The scorer, building it on first use when startup deferred it
    pub async fn scorer(&self) -> AppResult<Arc<Scorer>> {
        Ok(self.scorer.get().await?)
    }

    pub fn catalog(&self) -> &Catalog {
        self.scorer.catalog()
    }

    pub fn store(&self) -> AppResult<&Arc<dyn RecommendationStore>> {
        self.store.as_ref().ok_or(AppError::StoreUnavailable)
    }
}
