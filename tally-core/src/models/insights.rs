//! Dashboard and assistant payloads.

use serde::{Deserialize, Serialize};

use super::de::lenient_f64;

/// Aggregate figures from the statistics endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
    /// Number of persisted line items.
    pub total_items: u64,
    /// Sum of all line totals.
    #[serde(deserialize_with = "lenient_f64")]
    pub total_spent: f64,
    /// Mean unit price.
    #[serde(deserialize_with = "lenient_f64")]
    pub avg_item_price: f64,
    /// Number of distinct receipts.
    pub total_receipts: u64,
}

/// Spending for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// Category name, absent for uncategorized items.
    #[serde(default)]
    pub category: Option<String>,
    /// Item count.
    #[serde(default)]
    pub count: u64,
    /// Sum of line totals.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: f64,
}

/// Spending at one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreTotal {
    /// Store name, absent when OCR could not read one.
    #[serde(default)]
    pub store_name: Option<String>,
    /// Item count.
    #[serde(default)]
    pub count: u64,
    /// Sum of line totals.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: f64,
}

/// Qualitative spending summary.
///
/// When the user has no data the service answers with only a `message`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Insights {
    /// Sum of all line totals.
    #[serde(deserialize_with = "lenient_f64")]
    pub total_spent: f64,
    /// Number of persisted line items.
    pub total_items: u64,
    /// Spending since the first of the month.
    #[serde(deserialize_with = "lenient_f64")]
    pub this_month_spending: f64,
    /// Category with the highest spend.
    pub top_category: Option<String>,
    /// Store with the highest spend.
    pub top_store: Option<String>,
    /// Mean unit price.
    #[serde(deserialize_with = "lenient_f64")]
    pub avg_item_price: f64,
    /// Set instead of figures when there is nothing to summarize.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Insights {
    /// Whether the payload carries figures rather than a placeholder message.
    pub fn has_data(&self) -> bool {
        self.message.is_none()
    }
}

/// Assistant answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Echo of the question.
    #[serde(default)]
    pub query: String,
    /// Natural-language answer.
    pub response: String,
}
