//! Backend endpoint paths, relative to the configured base URL.

/// Password login.
pub const LOGIN: &str = "/api/users/login/";
/// Account registration.
pub const REGISTER: &str = "/api/users/register/";
/// Session invalidation.
pub const LOGOUT: &str = "/api/users/logout/";
/// Current user.
pub const ME: &str = "/api/users/me/";
/// Access-token renewal.
pub const TOKEN_REFRESH: &str = "/api/token/refresh/";

/// OCR extraction.
pub const OCR_PROCESS: &str = "/api/ocr/process/";
/// Item creation and listing.
pub const RECEIPTS: &str = "/api/receipts/";
/// Aggregate figures.
pub const RECEIPT_STATISTICS: &str = "/api/receipts/statistics/";
/// Spending per category.
pub const RECEIPTS_BY_CATEGORY: &str = "/api/receipts/by_category/";
/// Spending per store.
pub const RECEIPTS_BY_STORE: &str = "/api/receipts/by_store/";

/// Dashboard insights.
pub const CHAT_INSIGHTS: &str = "/api/chat/insights/";
/// Assistant query.
pub const CHAT_QUERY: &str = "/api/chat/query/";
