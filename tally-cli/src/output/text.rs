//! Text output formatting with colors.

use tally_core::{
    CategoryTotal, ExtractedReceipt, Identity, ReceiptGroup, StoreTotal, UploadRecord,
    UploadStatus,
};
use tally_store::{Dashboard, Settings, UploadEvent, UploadOutcome};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats an identity as "Name <email> (method)".
    pub fn format_identity(&self, identity: &Identity) -> String {
        let mut line = self.bold(&identity.name);
        if let Some(email) = &identity.email {
            line.push_str(&format!(" <{}>", self.cyan(email)));
        }
        line.push_str(&format!(" ({})", self.dim(&identity.auth_method.to_string())));
        if let Some(address) = &identity.wallet_address {
            line.push_str(&format!("\nWallet: {address}"));
        }
        line
    }

    /// Formats a failure message.
    pub fn format_failure(&self, message: &str) -> String {
        format!("{}: {message}", self.red("Error"))
    }

    // ========================================================================
    // Uploads
    // ========================================================================

    /// Formats one pipeline transition.
    pub fn format_upload_event(&self, event: &UploadEvent) -> String {
        format!(
            "{} {}",
            self.dim(&format!("[{}]", event.sequence)),
            self.format_record(&event.record)
        )
    }

    /// Formats an upload record as a single line.
    pub fn format_record(&self, record: &UploadRecord) -> String {
        let status = self.color_for_status(record.status, &record.status.to_string());
        let mut line = format!("{:<28} {status}", record.filename);
        if let Some(amount) = &record.amount {
            line.push_str(&format!("  {}", self.green(amount)));
        }
        if let Some(reason) = &record.failure {
            line.push_str(&format!("  {}", self.dim(&reason.to_string())));
        }
        line
    }

    /// Formats the final result of one upload.
    pub fn format_outcome(&self, outcome: &UploadOutcome) -> String {
        let mut lines = vec![self.format_record(&outcome.record)];
        let message = if outcome.is_success() {
            self.green(&outcome.message)
        } else {
            self.red(&outcome.message)
        };
        lines.push(format!("  {message}"));
        if outcome.attempted > 0 {
            lines.push(format!(
                "  {}",
                self.dim(&format!("{}/{} items saved", outcome.saved, outcome.attempted))
            ));
        }
        lines.join("\n")
    }

    /// Formats the OCR result: header, then one row per line item.
    pub fn format_extracted(&self, receipt: &ExtractedReceipt) -> String {
        let mut lines = Vec::new();

        let mut header = self.bold(receipt.store_label());
        if let Some(date) = &receipt.purchase_date {
            header.push_str(&format!("  {}", self.dim(date)));
        }
        if let Some(amount) = receipt.resolved_amount() {
            header.push_str(&format!("  {}", self.green(&amount)));
        }
        lines.push(header);
        lines.push("─".repeat(40));

        for item in &receipt.items {
            lines.push(format!("  {}", item.display_row()));
        }

        lines.join("\n")
    }

    // ========================================================================
    // Receipts
    // ========================================================================

    /// Formats grouped receipts as a table.
    pub fn format_receipts(&self, groups: &[&ReceiptGroup]) -> String {
        if groups.is_empty() {
            return self.dim("No receipts found.");
        }

        let mut lines = vec![format!(
            "{:<12} {:<20} {:<14} {:>10}  {}",
            self.bold("Date"),
            self.bold("Retailer"),
            self.bold("Category"),
            self.bold("Amount"),
            self.bold("Items")
        )];

        for group in groups {
            lines.push(format!(
                "{:<12} {:<20} {:<14} {:>10}  {}",
                group.date.as_deref().unwrap_or("-"),
                group.retailer,
                group.category,
                format!("${:.2}", group.amount),
                self.dim(&group.items.join(", "))
            ));
        }

        lines.join("\n")
    }

    /// Formats spending per category.
    pub fn format_categories(&self, totals: &[CategoryTotal]) -> String {
        let rows = totals.iter().map(|t| {
            (
                t.category.as_deref().unwrap_or("Uncategorized"),
                t.count,
                t.total,
            )
        });
        self.format_breakdown("Category", rows)
    }

    /// Formats spending per store.
    pub fn format_stores(&self, totals: &[StoreTotal]) -> String {
        let rows = totals
            .iter()
            .map(|t| (t.store_name.as_deref().unwrap_or("Unknown"), t.count, t.total));
        self.format_breakdown("Store", rows)
    }

    fn format_breakdown<'a>(
        &self,
        label: &str,
        rows: impl Iterator<Item = (&'a str, u64, f64)>,
    ) -> String {
        let mut lines = vec![format!(
            "{:<24} {:>6} {:>12}",
            self.bold(label),
            self.bold("Items"),
            self.bold("Total")
        )];
        for (name, count, total) in rows {
            lines.push(format!(
                "{name:<24} {count:>6} {:>12}",
                self.green(&format!("${total:.2}"))
            ));
        }
        lines.join("\n")
    }

    // ========================================================================
    // Dashboard
    // ========================================================================

    /// Formats the summary cards followed by the insights.
    pub fn format_dashboard(&self, dashboard: &Dashboard) -> String {
        let mut lines = vec![self.bold("Tally Dashboard"), "─".repeat(40)];

        for card in dashboard.cards() {
            lines.push(format!("{:<26} {}", format!("{}:", card.title), card.value));
        }

        let insights = &dashboard.insights;
        lines.push(String::new());
        if insights.has_data() {
            lines.push(self.dim("Insights:"));
            lines.push(format!(
                "  This month:     {}",
                self.green(&format!("${:.2}", insights.this_month_spending))
            ));
            if let Some(store) = &insights.top_store {
                lines.push(format!("  Top store:      {store}"));
            }
            lines.push(format!("  Avg item price: ${:.2}", insights.avg_item_price));
        } else if let Some(message) = &insights.message {
            lines.push(self.dim(message));
        }

        lines.join("\n")
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Formats settings as key/value lines.
    pub fn format_settings(&self, settings: &Settings) -> String {
        let cookie = if settings.session_cookie.is_some() {
            "(set)"
        } else {
            "(none)"
        };
        [
            ("base_url", settings.base_url.clone()),
            ("transport", settings.transport.to_string()),
            ("session_cookie", cookie.to_string()),
            (
                "request_timeout_secs",
                settings.request_timeout_secs.to_string(),
            ),
            ("credential_backend", settings.credential_backend.to_string()),
            ("log_level", settings.log_level.to_string()),
        ]
        .iter()
        .map(|(key, value)| format!("{:<22} {value}", self.bold(key)))
        .collect::<Vec<_>>()
        .join("\n")
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn color_for_status(&self, status: UploadStatus, text: &str) -> String {
        match status {
            UploadStatus::Processing => self.yellow(text),
            UploadStatus::Processed => self.green(text),
            UploadStatus::Failed => self.red(text),
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_colors() {
        let formatter = TextFormatter::new(true);
        assert!(
            formatter
                .color_for_status(UploadStatus::Failed, "failed")
                .contains(RED)
        );
        assert!(
            formatter
                .color_for_status(UploadStatus::Processed, "processed")
                .contains(GREEN)
        );
        assert!(
            formatter
                .color_for_status(UploadStatus::Processing, "processing")
                .contains(YELLOW)
        );
    }

    #[test]
    fn test_no_colors() {
        let formatter = TextFormatter::new(false);
        assert_eq!(formatter.bold("x"), "x");
        assert_eq!(formatter.format_failure("boom"), "Error: boom");
    }
}
