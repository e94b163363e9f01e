//! Serde tests for core types against the payloads the backend emits.

use serde_json::json;

use crate::{
    AuthMethod, ChatReply, ExtractedReceipt, FailureReason, Identity, Insights, OcrResult,
    ReceiptItem, Statistics, UploadStatus, UserProfile,
};

// ============================================================================
// Identity
// ============================================================================

#[test]
fn test_wallet_identity_serializes_camel_case() {
    let identity = Identity::new("civic-1", "Ada", AuthMethod::Wallet)
        .with_email("ada@example.com")
        .with_wallet_address("0xabc");

    let value = serde_json::to_value(&identity).unwrap();
    assert_eq!(value["authMethod"], "wallet");
    assert_eq!(value["walletAddress"], "0xabc");
    assert_eq!(value["email"], "ada@example.com");
}

#[test]
fn test_identity_accepts_widget_payload() {
    let payload = json!({
        "id": 99,
        "name": "Grace",
        "email": "grace@example.com",
        "authMethod": "google"
    });
    let identity: Identity = serde_json::from_value(payload).unwrap();
    assert_eq!(identity.id, "99");
    assert_eq!(identity.auth_method, AuthMethod::Google);
    assert!(identity.wallet_address.is_none());
}

#[test]
fn test_identity_legacy_jwt_method() {
    let identity: Identity =
        serde_json::from_str(r#"{"id":"1","name":"x","authMethod":"jwt"}"#).unwrap();
    assert_eq!(identity.auth_method, AuthMethod::Password);
}

#[test]
fn test_user_profile_numeric_id() {
    let profile: UserProfile = serde_json::from_value(json!({
        "id": 12,
        "username": "ada",
        "email": "ada@example.com",
        "auth_method": "jwt"
    }))
    .unwrap();
    assert_eq!(profile.id, "12");
    assert_eq!(profile.username.as_deref(), Some("ada"));
}

// ============================================================================
// OCR
// ============================================================================

#[test]
fn test_ocr_result_string_prices() {
    let result: OcrResult = serde_json::from_value(json!({
        "raw_text": "ACME\nPen 2 9.99",
        "structured_data": {
            "store_name": "Acme",
            "purchase_date": "2024-01-01",
            "total_amount": "19.98",
            "items": [{"item_name": "Pen", "quantity": 2, "price": "9.99"}]
        }
    }))
    .unwrap();

    let data = result.structured_data.unwrap();
    assert_eq!(data.store_name.as_deref(), Some("Acme"));
    assert_eq!(data.total_amount.as_deref(), Some("19.98"));
    assert_eq!(data.items[0].price, "9.99");
    assert_eq!(data.items[0].quantity, 2);
}

#[test]
fn test_ocr_result_numeric_prices() {
    let data: ExtractedReceipt = serde_json::from_value(json!({
        "store_name": null,
        "total_amount": 7.5,
        "items": [{"item_name": "Tea", "quantity": "3", "price": 2.5}]
    }))
    .unwrap();
    assert_eq!(data.total_amount.as_deref(), Some("7.5"));
    assert_eq!(data.items[0].price, "2.5");
    assert_eq!(data.items[0].quantity, 3);
    assert!(data.purchase_date.is_none());
}

#[test]
fn test_ocr_result_without_structure() {
    let result: OcrResult = serde_json::from_str(r#"{"raw_text": ""}"#).unwrap();
    assert!(result.structured_data.is_none());

    let data: ExtractedReceipt = serde_json::from_str(r#"{"store_name": "A"}"#).unwrap();
    assert!(!data.has_items());
}

// ============================================================================
// Listing & Dashboard
// ============================================================================

#[test]
fn test_receipt_item_decimal_strings() {
    let item: ReceiptItem = serde_json::from_value(json!({
        "id": 4,
        "receipt_id": "Acme_1",
        "item_name": "Pen",
        "quantity": 2,
        "price": "9.99",
        "total_amount": "19.98",
        "category": "General",
        "store_name": "Acme",
        "purchase_date": "2024-01-01"
    }))
    .unwrap();
    assert!((item.total_amount - 19.98).abs() < f64::EPSILON);
    assert!((item.price - 9.99).abs() < f64::EPSILON);
}

#[test]
fn test_statistics_defaults() {
    let stats: Statistics = serde_json::from_value(json!({
        "total_items": 3,
        "total_spent": "41.20",
        "total_receipts": 2
    }))
    .unwrap();
    assert_eq!(stats.total_items, 3);
    assert!((stats.total_spent - 41.2).abs() < 1e-9);
    assert!(stats.avg_item_price.abs() < f64::EPSILON);
}

#[test]
fn test_insights_message_only() {
    let insights: Insights =
        serde_json::from_str(r#"{"message": "No data available for insights"}"#).unwrap();
    assert!(!insights.has_data());
    assert!(insights.top_store.is_none());
}

#[test]
fn test_insights_with_nulls() {
    let insights: Insights = serde_json::from_value(json!({
        "total_spent": 10,
        "total_items": 1,
        "this_month_spending": null,
        "top_category": "General",
        "top_store": null,
        "avg_item_price": "10.00"
    }))
    .unwrap();
    assert!(insights.has_data());
    assert!(insights.this_month_spending.abs() < f64::EPSILON);
    assert_eq!(insights.top_category.as_deref(), Some("General"));
}

#[test]
fn test_chat_reply() {
    let reply: ChatReply =
        serde_json::from_str(r#"{"query":"q","response":"You spent $5","context":"..."}"#)
            .unwrap();
    assert_eq!(reply.response, "You spent $5");
}

// ============================================================================
// Uploads
// ============================================================================

#[test]
fn test_upload_status_lowercase() {
    assert_eq!(
        serde_json::to_string(&UploadStatus::Processed).unwrap(),
        r#""processed""#
    );
}

#[test]
fn test_failure_reason_tagging() {
    let value = serde_json::to_value(FailureReason::ocr(Some("bad image".into()))).unwrap();
    assert_eq!(value, json!({"kind": "ocr", "message": "bad image"}));

    let value = serde_json::to_value(FailureReason::NoItems).unwrap();
    assert_eq!(value, json!({"kind": "no_items"}));
}
