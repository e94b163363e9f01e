//! Output formatting for CLI.

mod json;
mod text;

pub use json::{ChatOutput, DashboardOutput, JsonFormatter, ReceiptsOutput, SettingsOutput, UploadOutput};
pub use text::TextFormatter;
