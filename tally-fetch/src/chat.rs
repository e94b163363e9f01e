//! Assistant service.

use serde::Serialize;
use tally_core::{ChatReply, Insights};
use tracing::instrument;

use crate::client::ApiClient;
use crate::endpoints;
use crate::error::ApiError;

#[derive(Serialize)]
struct Query<'a> {
    query: &'a str,
}

/// Chat endpoints.
#[derive(Debug, Clone)]
pub struct ChatApi {
    client: ApiClient,
}

impl ChatApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Asks the assistant a question about the user's spending.
    ///
    /// Blank queries are rejected without a request.
    #[instrument(skip(self, query), fields(len = query.len()))]
    pub async fn query(&self, query: &str) -> Result<ChatReply, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::InvalidInput("Query is required".to_string()));
        }
        self.client.post_json(endpoints::CHAT_QUERY, &Query { query }).await
    }

    /// Quick insights for the dashboard.
    pub async fn insights(&self) -> Result<Insights, ApiError> {
        self.client.get_json(endpoints::CHAT_INSIGHTS).await
    }
}
