//! Re-issuable request descriptions.
//!
//! An [`ApiRequest`] owns everything needed to build the HTTP request, so the
//! client can send it a second time after a token refresh.

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

// ============================================================================
// Body
// ============================================================================

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// JSON document.
    Json(Value),
    /// A single file in a multipart form.
    Multipart {
        /// Form field name.
        field: String,
        /// Original filename.
        filename: String,
        /// File contents.
        bytes: Vec<u8>,
        /// MIME type, if known.
        mime: Option<String>,
    },
}

impl RequestBody {
    /// Builds a fresh multipart form for this body, if it is one.
    pub(crate) fn to_form(&self) -> Result<Option<Form>, ApiError> {
        let Self::Multipart {
            field,
            filename,
            bytes,
            mime,
        } = self
        else {
            return Ok(None);
        };

        let mut part = Part::bytes(bytes.clone()).file_name(filename.clone());
        if let Some(mime) = mime {
            part = part
                .mime_str(mime)
                .map_err(|e| ApiError::Decode(format!("invalid MIME type {mime}: {e}")))?;
        }
        Ok(Some(Form::new().part(field.clone(), part)))
    }
}

// ============================================================================
// Request
// ============================================================================

/// A request the client may issue more than once.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the base URL.
    pub path: String,
    /// Body.
    pub body: RequestBody,
    /// Whether a 401 may trigger a token refresh.
    pub allow_refresh: bool,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>, body: RequestBody) -> Self {
        Self {
            method,
            path: path.into(),
            body,
            allow_refresh: true,
        }
    }

    /// GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path, RequestBody::Empty)
    }

    /// POST with a JSON body.
    pub fn post_json<T: Serialize + ?Sized>(
        path: impl Into<String>,
        body: &T,
    ) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(Self::new(Method::POST, path, RequestBody::Json(value)))
    }

    /// POST without a body.
    pub fn post_empty(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path, RequestBody::Empty)
    }

    /// POST a single file as multipart form data.
    pub fn multipart(
        path: impl Into<String>,
        field: impl Into<String>,
        filename: impl Into<String>,
        bytes: Vec<u8>,
        mime: Option<String>,
    ) -> Self {
        Self::new(
            Method::POST,
            path,
            RequestBody::Multipart {
                field: field.into(),
                filename: filename.into(),
                bytes,
                mime,
            },
        )
    }

    /// Disables refresh-on-401 for this request.
    ///
    /// Used for the login, registration and refresh calls themselves, whose
    /// 401 means bad input rather than an expired token.
    #[must_use]
    pub fn without_refresh(mut self) -> Self {
        self.allow_refresh = false;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_json_captures_body() {
        let req = ApiRequest::post_json("/api/chat/query/", &json!({"query": "hi"})).unwrap();
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.body, RequestBody::Json(json!({"query": "hi"})));
        assert!(req.allow_refresh);
    }

    #[test]
    fn test_without_refresh() {
        let req = ApiRequest::post_empty("/api/token/refresh/").without_refresh();
        assert!(!req.allow_refresh);
    }

    #[test]
    fn test_multipart_form_rebuilds() {
        let req = ApiRequest::multipart(
            "/api/ocr/process/",
            "image",
            "r.png",
            vec![1, 2, 3],
            Some("image/png".to_string()),
        );
        assert!(req.body.to_form().unwrap().is_some());
        // A second build is possible for the retry.
        assert!(req.body.to_form().unwrap().is_some());
    }

    #[test]
    fn test_bad_mime_rejected() {
        let req = ApiRequest::multipart("/x", "image", "r", vec![], Some("not a mime".into()));
        assert!(req.body.to_form().is_err());
    }

    #[test]
    fn test_non_multipart_has_no_form() {
        assert!(RequestBody::Empty.to_form().unwrap().is_none());
    }
}
