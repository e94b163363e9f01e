//! Upload pipeline against mock OCR and receipt services.

use std::sync::Arc;

use chrono::Local;
use serde_json::{Value, json};
use tally_core::{FailureReason, NewReceiptItem, UploadStatus};
use tally_fetch::{ApiClient, MemoryCredentialStore, keys};
use tally_store::{SourceFile, UploadPipeline};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pipeline(server: &MockServer) -> UploadPipeline {
    let store = Arc::new(MemoryCredentialStore::with_values([(keys::ACCESS_TOKEN, "acc")]));
    let client = ApiClient::builder(server.uri())
        .credentials(store)
        .build()
        .unwrap();
    UploadPipeline::new(client)
}

fn receipt_file() -> SourceFile {
    SourceFile::new("acme.png", b"fake image bytes".to_vec())
}

async fn mount_ocr(server: &MockServer, structured: Value) {
    Mock::given(method("POST"))
        .and(path("/api/ocr/process/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "raw_text": "ACME STORE",
            "structured_data": structured
        })))
        .mount(server)
        .await;
}

async fn mount_create(server: &MockServer, status: u16, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/api/receipts/"))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({"id": 1})))
        .expect(expected)
        .mount(server)
        .await;
}

async fn created_items(server: &MockServer) -> Vec<NewReceiptItem> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/api/receipts/")
        .map(|r| r.body_json().unwrap())
        .collect()
}

#[tokio::test]
async fn test_successful_upload() {
    let server = MockServer::start().await;
    mount_ocr(
        &server,
        json!({
            "store_name": "Acme",
            "purchase_date": "2024-01-01",
            "total_amount": "19.98",
            "items": [{"item_name": "Pen", "quantity": 2, "price": "9.99"}]
        }),
    )
    .await;
    mount_create(&server, 201, 1).await;

    let pipeline = pipeline(&server);
    let mut events = pipeline.subscribe();

    let outcome = pipeline.submit(receipt_file()).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.record.status, UploadStatus::Processed);
    assert_eq!(outcome.record.amount.as_deref(), Some("$19.98"));
    assert_eq!(
        outcome.message,
        "Successfully processed and saved 1 items from acme.png!"
    );

    let extracted = pipeline.extracted().await.unwrap();
    let rows: Vec<String> = extracted.items.iter().map(|i| i.display_row()).collect();
    assert_eq!(rows, vec!["Pen, 2, $9.99"]);

    // processing, then processed
    let first = events.recv().await.unwrap();
    let second = events.recv().await.unwrap();
    assert_eq!(first.record.status, UploadStatus::Processing);
    assert_eq!(second.record.status, UploadStatus::Processed);
    assert_eq!((first.sequence, second.sequence), (1, 2));

    let items = created_items(&server).await;
    assert_eq!(items[0].category, "General");
    assert_eq!(items[0].purchase_date, "2024-01-01");
    assert!(items[0].receipt_id.starts_with("Acme_"));
}

#[tokio::test]
async fn test_zero_items_fails_without_saving() {
    let server = MockServer::start().await;
    mount_ocr(&server, json!({"store_name": "Acme", "items": []})).await;
    mount_create(&server, 201, 0).await;

    let pipeline = pipeline(&server);
    let outcome = pipeline.submit(receipt_file()).await;

    assert_eq!(outcome.record.status, UploadStatus::Failed);
    assert_eq!(outcome.record.failure, Some(FailureReason::NoItems));
    assert_eq!(outcome.message, "No items were found on the receipt to save.");
    assert_eq!(outcome.attempted, 0);
}

#[tokio::test]
async fn test_missing_structured_data_counts_as_no_items() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ocr/process/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"raw_text": "???"})))
        .mount(&server)
        .await;
    mount_create(&server, 201, 0).await;

    let outcome = pipeline(&server).submit(receipt_file()).await;
    assert_eq!(outcome.record.failure, Some(FailureReason::NoItems));
    assert!(outcome.receipt.is_none());
}

#[tokio::test]
async fn test_partial_save_attempts_every_item() {
    let server = MockServer::start().await;
    mount_ocr(
        &server,
        json!({
            "store_name": "Acme",
            "total_amount": 30,
            "items": [
                {"item_name": "Pen", "quantity": 1, "price": "10.00"},
                {"item_name": "Paper", "quantity": 1, "price": "10.00"},
                {"item_name": "Ink", "quantity": 1, "price": "10.00"}
            ]
        }),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/receipts/"))
        .and(body_string_contains("Paper"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "db down"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_create(&server, 201, 2).await;

    let pipeline = pipeline(&server);
    let outcome = pipeline.submit(receipt_file()).await;

    assert_eq!(outcome.record.status, UploadStatus::Failed);
    assert_eq!(outcome.record.failure, Some(FailureReason::PartialSave));
    assert_eq!(outcome.message, "Processed receipt, but failed to save items.");
    assert_eq!((outcome.attempted, outcome.saved), (3, 2));

    let items = created_items(&server).await;
    assert_eq!(items.len(), 3);
    // One receipt id for the whole upload.
    assert!(items.iter().all(|i| i.receipt_id == items[0].receipt_id));
    // No OCR date: today.
    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
    assert!(items.iter().all(|i| i.purchase_date == today));
}

#[tokio::test]
async fn test_ocr_error_uses_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ocr/process/"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": "Could not extract text from image"})),
        )
        .mount(&server)
        .await;
    mount_create(&server, 201, 0).await;

    let outcome = pipeline(&server).submit(receipt_file()).await;
    assert_eq!(outcome.record.status, UploadStatus::Failed);
    assert_eq!(outcome.message, "Could not extract text from image");
}

#[tokio::test]
async fn test_ocr_error_without_message_uses_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ocr/process/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let outcome = pipeline(&server).submit(receipt_file()).await;
    assert_eq!(outcome.message, "Error processing receipt");
}

#[tokio::test]
async fn test_records_newest_first_and_extracted_cleared() {
    let server = MockServer::start().await;
    mount_ocr(
        &server,
        json!({
            "store_name": "Acme",
            "items": [{"item_name": "Pen", "quantity": 1, "price": "1.00"}]
        }),
    )
    .await;
    mount_create(&server, 201, 1).await;

    let pipeline = pipeline(&server);
    let first = pipeline.submit(receipt_file()).await;
    assert!(pipeline.extracted().await.is_some());

    // The second upload fails at OCR, so nothing replaces the cleared receipt.
    server.reset().await;
    Mock::given(method("POST"))
        .and(path("/api/ocr/process/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let second = pipeline.submit(SourceFile::new("blurry.jpg", vec![0; 8])).await;

    assert_ne!(first.record.id, second.record.id);
    let records = pipeline.records().await;
    assert_eq!(records[0].filename, "blurry.jpg");
    assert_eq!(records[1].filename, "acme.png");
    assert!(pipeline.extracted().await.is_none());

    let log = pipeline.events().await;
    assert_eq!(log.len(), 4);
    assert!(log.windows(2).all(|w| w[0].sequence < w[1].sequence));
}
