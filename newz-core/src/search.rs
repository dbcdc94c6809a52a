use std::sync::{Mutex, MutexGuard};

use tracing::{info, warn};

use crate::api::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::models::RagAnswer;
use crate::request::RequestSlot;

#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub query: String,
    pub loading: bool,
    pub result: Option<RagAnswer>,
    pub error: Option<String>,
}

/// Question answering over the indexed news articles.
pub struct AiSearch {
    api: ApiClient,
    state: Mutex<SearchState>,
    requests: RequestSlot,
}

impl AiSearch {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Mutex::new(SearchState::default()),
            requests: RequestSlot::new("rag-search"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SearchState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> SearchState {
        self.lock().clone()
    }

    /// Asks `query`. Blank queries are rejected and a search that is still
    /// loading is not interrupted by a second submit (`Ok(None)`).
    pub async fn search(&self, query: &str) -> ApiResult<Option<RagAnswer>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::EmptyQuery);
        }
        {
            let mut s = self.lock();
            if s.loading {
                return Ok(None);
            }
            s.query = query.to_string();
            s.loading = true;
            s.result = None;
            s.error = None;
        }

        let handle = self.requests.begin();
        let result = handle.run(self.api.rag_search(query)).await;
        if !self.requests.is_current(&handle) {
            return Err(ApiError::Cancelled);
        }
        self.requests.finish(&handle);

        let mut s = self.lock();
        s.loading = false;
        match result {
            Ok(answer) => {
                info!(sources = answer.sources.len(), "ai search answered");
                s.result = Some(answer.clone());
                Ok(Some(answer))
            }
            Err(err) => {
                warn!(error = %err, "ai search failed");
                s.error = Some(match &err {
                    ApiError::Status { message, .. } => message.clone(),
                    _ => "The search failed. Please try again.".to_string(),
                });
                Err(err)
            }
        }
    }

    /// Asks the backend to rebuild its article index.
    pub async fn trigger_indexing(&self) -> ApiResult<serde_json::Value> {
        let ack = self.api.trigger_indexing().await?;
        info!("article indexing started");
        Ok(ack)
    }

    pub fn cancel(&self) {
        self.requests.cancel();
        self.lock().loading = false;
    }
}
