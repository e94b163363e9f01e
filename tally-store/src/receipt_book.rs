//! Stored items grouped into receipts.

use std::collections::HashMap;

use chrono::NaiveDate;
use tally_core::{DEFAULT_CATEGORY, ReceiptGroup, ReceiptItem};
use tally_fetch::ApiClient;
use tracing::debug;

use crate::error::StoreError;

/// The user's receipts, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiptBook {
    groups: Vec<ReceiptGroup>,
}

impl ReceiptBook {
    /// Fetches the listing and groups it.
    pub async fn load(client: &ApiClient) -> Result<Self, StoreError> {
        let items = client.receipts().list().await?;
        Ok(Self::from_items(items))
    }

    /// Groups items sharing a store and purchase date.
    ///
    /// A group takes its id and category from its first item and sums the
    /// line totals.
    pub fn from_items(items: impl IntoIterator<Item = ReceiptItem>) -> Self {
        let mut groups: Vec<ReceiptGroup> = Vec::new();
        let mut index: HashMap<(Option<String>, Option<String>), usize> = HashMap::new();

        for item in items {
            let key = (item.store_name.clone(), item.purchase_date.clone());
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push(ReceiptGroup {
                    id: item.id,
                    date: item.purchase_date.clone(),
                    retailer: item
                        .store_name
                        .clone()
                        .unwrap_or_else(|| "Unknown".to_string()),
                    category: item
                        .category
                        .clone()
                        .filter(|c| !c.is_empty())
                        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
                    amount: 0.0,
                    items: Vec::new(),
                });
                groups.len() - 1
            });

            let group = &mut groups[slot];
            group.amount += item.total_amount;
            group.items.push(item.item_name);
        }

        // Undated groups sink to the bottom; ties keep listing order.
        groups.sort_by_key(|g| std::cmp::Reverse(parse_date(g.date.as_deref())));

        debug!(groups = groups.len(), "Grouped receipt items");
        Self { groups }
    }

    /// All receipts.
    pub fn groups(&self) -> &[ReceiptGroup] {
        &self.groups
    }

    /// Number of receipts.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no receipts.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Case-insensitive substring search over retailer, category and item
    /// names. An empty term matches everything.
    pub fn search(&self, term: &str) -> Vec<&ReceiptGroup> {
        let term = term.trim().to_lowercase();
        self.groups.iter().filter(|g| g.matches(&term)).collect()
    }

    /// Sum of all receipt amounts.
    pub fn total(&self) -> f64 {
        self.groups.iter().map(|g| g.amount).sum()
    }
}

fn parse_date(date: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date?.get(..10)?, "%Y-%m-%d").ok()
}

// ============================================================================
// Tests
// ============================================================================
