//! Receipt types.
//!
//! - [`ExtractedReceipt`] / [`LineItem`] - What OCR found on one image
//! - [`NewReceiptItem`] - Payload persisted per line item
//! - [`ReceiptItem`] - A persisted item as returned by the listing endpoint
//! - [`ReceiptGroup`] - Persisted items folded into one logical receipt

use serde::{Deserialize, Serialize};

use super::de::{lenient_f64, lenient_u32, opt_string_or_number, string_or_number};

/// Category assigned to items saved from an upload.
pub const DEFAULT_CATEGORY: &str = "General";

/// Formats a decimal string as dollars with two places.
///
/// Values that do not parse are shown verbatim behind the dollar sign.
pub fn format_currency(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(value) => format!("${value:.2}"),
        Err(_) => format!("${raw}"),
    }
}

// ============================================================================
// OCR Output
// ============================================================================

/// Response body of the OCR processing endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrResult {
    /// Raw recognized text.
    #[serde(default)]
    pub raw_text: Option<String>,
    /// Structured extraction, absent when the service found nothing usable.
    #[serde(default)]
    pub structured_data: Option<ExtractedReceipt>,
}

/// One line item found by OCR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Item description.
    pub item_name: String,
    /// Units purchased.
    #[serde(default, deserialize_with = "lenient_u32")]
    pub quantity: u32,
    /// Unit price as a decimal string.
    #[serde(deserialize_with = "string_or_number")]
    pub price: String,
}

impl LineItem {
    /// Price formatted for display.
    pub fn display_price(&self) -> String {
        format_currency(&self.price)
    }

    /// Single-line rendering: `name, quantity, $price`.
    pub fn display_row(&self) -> String {
        format!("{}, {}, {}", self.item_name, self.quantity, self.display_price())
    }
}

/// Structured OCR output for one upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedReceipt {
    /// Merchant name.
    #[serde(default)]
    pub store_name: Option<String>,
    /// Purchase date (`YYYY-MM-DD`) if the service could read one.
    #[serde(default)]
    pub purchase_date: Option<String>,
    /// Receipt total as a decimal string.
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub total_amount: Option<String>,
    /// Line items in receipt order.
    #[serde(default)]
    pub items: Vec<LineItem>,
}

impl ExtractedReceipt {
    /// Store name, or `"Unknown"` when OCR could not read one.
    pub fn store_label(&self) -> &str {
        self.store_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("Unknown")
    }

    /// Whether OCR produced any line items.
    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    /// Total as shown on an upload record (`$<total>`).
    pub fn resolved_amount(&self) -> Option<String> {
        self.total_amount.as_ref().map(|t| format!("${t}"))
    }

    /// Purchase date, falling back to the supplied date when unreadable.
    pub fn purchase_date_or(&self, fallback: &str) -> String {
        self.purchase_date
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

// ============================================================================
// Persistence Payload
// ============================================================================

/// Body of one item-creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReceiptItem {
    /// Composite receipt id shared by every item of one upload.
    pub receipt_id: String,
    /// Item description.
    pub item_name: String,
    /// Units purchased.
    pub quantity: u32,
    /// Unit price as a decimal string.
    pub price: String,
    /// Spending category.
    pub category: String,
    /// Merchant name.
    pub store_name: String,
    /// Purchase date (`YYYY-MM-DD`).
    pub purchase_date: String,
}

impl NewReceiptItem {
    /// Builds the payload for one extracted line item.
    pub fn from_line(
        receipt_id: &str,
        receipt: &ExtractedReceipt,
        item: &LineItem,
        purchase_date: &str,
    ) -> Self {
        Self {
            receipt_id: receipt_id.to_string(),
            item_name: item.item_name.clone(),
            quantity: item.quantity,
            price: item.price.clone(),
            category: DEFAULT_CATEGORY.to_string(),
            store_name: receipt.store_label().to_string(),
            purchase_date: purchase_date.to_string(),
        }
    }
}

// ============================================================================
// Persisted Items
// ============================================================================

/// A persisted line item from the receipts listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    /// Server id.
    pub id: i64,
    /// Receipt the item was saved under.
    #[serde(default)]
    pub receipt_id: Option<String>,
    /// Item description.
    pub item_name: String,
    /// Units purchased.
    #[serde(default, deserialize_with = "lenient_u32")]
    pub quantity: u32,
    /// Unit price.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: f64,
    /// Line total (quantity × price).
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_amount: f64,
    /// Spending category.
    #[serde(default)]
    pub category: Option<String>,
    /// Merchant name.
    #[serde(default)]
    pub store_name: Option<String>,
    /// Purchase date (`YYYY-MM-DD`).
    #[serde(default)]
    pub purchase_date: Option<String>,
}

/// Persisted items that share a store and purchase date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptGroup {
    /// Id of the first item in the group.
    pub id: i64,
    /// Purchase date.
    pub date: Option<String>,
    /// Merchant name.
    pub retailer: String,
    /// Category of the first item.
    pub category: String,
    /// Sum of line totals.
    pub amount: f64,
    /// Item names in listing order.
    pub items: Vec<String>,
}

impl ReceiptGroup {
    /// Case-insensitive substring match on retailer, category or any item.
    ///
    /// `term` must already be lowercase.
    pub fn matches(&self, term: &str) -> bool {
        self.retailer.to_lowercase().contains(term)
            || self.category.to_lowercase().contains(term)
            || self.items.iter().any(|i| i.to_lowercase().contains(term))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pen() -> LineItem {
        LineItem {
            item_name: "Pen".to_string(),
            quantity: 2,
            price: "9.99".to_string(),
        }
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency("9.99"), "$9.99");
        assert_eq!(format_currency("3"), "$3.00");
        assert_eq!(format_currency("1.005x"), "$1.005x");
    }

    #[test]
    fn test_line_item_display_row() {
        assert_eq!(pen().display_row(), "Pen, 2, $9.99");
    }

    #[test]
    fn test_resolved_amount() {
        let receipt = ExtractedReceipt {
            total_amount: Some("19.98".to_string()),
            ..Default::default()
        };
        assert_eq!(receipt.resolved_amount().as_deref(), Some("$19.98"));
        assert_eq!(ExtractedReceipt::default().resolved_amount(), None);
    }

    #[test]
    fn test_purchase_date_fallback() {
        let mut receipt = ExtractedReceipt::default();
        assert_eq!(receipt.purchase_date_or("2024-05-01"), "2024-05-01");

        receipt.purchase_date = Some("2024-01-01".to_string());
        assert_eq!(receipt.purchase_date_or("2024-05-01"), "2024-01-01");
    }

    #[test]
    fn test_new_item_payload() {
        let receipt = ExtractedReceipt {
            store_name: Some("Acme".to_string()),
            purchase_date: None,
            total_amount: None,
            items: vec![pen()],
        };
        let payload = NewReceiptItem::from_line("Acme_1", &receipt, &receipt.items[0], "2024-02-02");
        assert_eq!(payload.category, DEFAULT_CATEGORY);
        assert_eq!(payload.store_name, "Acme");
        assert_eq!(payload.purchase_date, "2024-02-02");
        assert_eq!(payload.quantity, 2);
    }

    #[test]
    fn test_store_label_unknown() {
        let receipt = ExtractedReceipt {
            store_name: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(receipt.store_label(), "Unknown");
    }

    #[test]
    fn test_group_matches() {
        let group = ReceiptGroup {
            id: 1,
            date: Some("2024-01-01".to_string()),
            retailer: "Corner Market".to_string(),
            category: "Groceries".to_string(),
            amount: 12.5,
            items: vec!["Oat Milk".to_string(), "Bread".to_string()],
        };
        assert!(group.matches("market"));
        assert!(group.matches("grocer"));
        assert!(group.matches("oat"));
        assert!(!group.matches("hardware"));
    }
}
