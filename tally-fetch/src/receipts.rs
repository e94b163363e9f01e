//! Receipts service: OCR extraction, item persistence, listing and figures.

use serde::Deserialize;
use tally_core::{CategoryTotal, NewReceiptItem, OcrResult, ReceiptItem, Statistics, StoreTotal};
use tracing::{debug, instrument};

use crate::client::ApiClient;
use crate::endpoints;
use crate::error::ApiError;
use crate::request::ApiRequest;

/// Multipart field the OCR endpoint reads the image from.
pub const OCR_FIELD: &str = "image";

/// Listing body: paginated or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum ItemList {
    Page { results: Vec<ReceiptItem> },
    Bare(Vec<ReceiptItem>),
}

impl ItemList {
    fn into_items(self) -> Vec<ReceiptItem> {
        match self {
            Self::Page { results } => results,
            Self::Bare(items) => items,
        }
    }
}

/// Receipt endpoints.
#[derive(Debug, Clone)]
pub struct ReceiptsApi {
    client: ApiClient,
}

impl ReceiptsApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Uploads a receipt image for OCR extraction.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn process_image(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        mime: Option<String>,
    ) -> Result<OcrResult, ApiError> {
        let request = ApiRequest::multipart(endpoints::OCR_PROCESS, OCR_FIELD, filename, bytes, mime);
        let result: OcrResult = self.client.send_json(&request).await?;
        debug!(
            items = result.structured_data.as_ref().map_or(0, |r| r.items.len()),
            "OCR complete"
        );
        Ok(result)
    }

    /// Persists one line item.
    #[instrument(skip(self, item), fields(receipt_id = %item.receipt_id, item = %item.item_name))]
    pub async fn create_item(&self, item: &NewReceiptItem) -> Result<(), ApiError> {
        self.client
            .send_discard(&ApiRequest::post_json(endpoints::RECEIPTS, item)?)
            .await
    }

    /// Lists the user's stored items.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<ReceiptItem>, ApiError> {
        let list: ItemList = self.client.get_json(endpoints::RECEIPTS).await?;
        let items = list.into_items();
        debug!(count = items.len(), "Listed receipt items");
        Ok(items)
    }

    /// Aggregate dashboard figures.
    pub async fn statistics(&self) -> Result<Statistics, ApiError> {
        self.client.get_json(endpoints::RECEIPT_STATISTICS).await
    }

    /// Spending per category.
    pub async fn by_category(&self) -> Result<Vec<CategoryTotal>, ApiError> {
        self.client.get_json(endpoints::RECEIPTS_BY_CATEGORY).await
    }

    /// Spending per store.
    pub async fn by_store(&self) -> Result<Vec<StoreTotal>, ApiError> {
        self.client.get_json(endpoints::RECEIPTS_BY_STORE).await
    }
}
