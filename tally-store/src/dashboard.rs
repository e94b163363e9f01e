//! Dashboard figures.

use futures::try_join;
use serde::Serialize;
use tally_core::{Insights, Statistics};
use tally_fetch::ApiClient;
use tracing::instrument;

use crate::error::StoreError;

/// One headline figure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryCard {
    /// Label.
    pub title: &'static str,
    /// Rendered value.
    pub value: String,
}

/// Statistics and insights, fetched together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    /// Aggregate figures.
    pub statistics: Statistics,
    /// Qualitative summary; may be empty for new accounts.
    pub insights: Insights,
}

impl Dashboard {
    /// Fetches both payloads concurrently. Either failure fails the load.
    #[instrument(skip(client))]
    pub async fn load(client: &ApiClient) -> Result<Self, StoreError> {
        let receipts = client.receipts();
        let chat = client.chat();
        let (statistics, insights) = try_join!(receipts.statistics(), chat.insights())?;
        Ok(Self {
            statistics,
            insights,
        })
    }

    /// The headline cards.
    pub fn cards(&self) -> Vec<SummaryCard> {
        vec![
            SummaryCard {
                title: "Total Receipts Processed",
                value: self.statistics.total_receipts.to_string(),
            },
            SummaryCard {
                title: "Top Category",
                value: self
                    .insights
                    .top_category
                    .clone()
                    .unwrap_or_else(|| "N/A".to_string()),
            },
            SummaryCard {
                title: "Total Spent",
                value: format!("${:.2}", self.statistics.total_spent),
            },
        ]
    }
}
