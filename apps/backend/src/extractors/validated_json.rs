use std::future::Future;
use std::ops::Deref;
use std::pin::Pin;

use actix_web::dev::Payload;
use actix_web::web::Bytes;
use actix_web::{FromRequest, HttpRequest};
use serde::de::DeserializeOwned;
use serde_json::Error as JsonError;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::logging::pii::Redacted;

/// Error code for request bodies that are not valid JSON for the handler.
pub const INVALID_BODY: &str = "INVALID_BODY";

/// Auth payloads are a handful of short strings.
pub const MAX_BODY_BYTES: usize = 16 * 1024;

/// JSON body extractor that reports failures as a 400 [`AppError`] instead of
/// actix's plain-text default.
///
/// Serde messages are logged redacted at debug level and never echoed to the
/// client; they can quote fragments of the body, passwords included.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T> ValidatedJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for ValidatedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> FromRequest for ValidatedJson<T>
where
    T: DeserializeOwned + 'static,
{
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let body = Bytes::from_request(req, payload);

        Box::pin(async move {
            let body = body.await.map_err(|e| {
                warn!(error = %e, "failed to read request body");
                AppError::bad_request(INVALID_BODY, "Failed to read request body")
            })?;

            if body.len() > MAX_BODY_BYTES {
                return Err(AppError::bad_request(
                    INVALID_BODY,
                    format!("Request body exceeds {MAX_BODY_BYTES} bytes"),
                ));
            }

            parse_body(&body).map(ValidatedJson)
        })
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        debug!(
            error = %Redacted(&e.to_string()),
            body_size = body.len(),
            "JSON body rejected"
        );
        AppError::bad_request(INVALID_BODY, classify_json_error(&e))
    })
}

/// Client-facing message for a serde failure. Never includes body content.
fn classify_json_error(error: &JsonError) -> String {
    match error.classify() {
        serde_json::error::Category::Syntax => {
            let line = error.line();
            format!("Invalid JSON at line {line}")
        }
        serde_json::error::Category::Eof => "Invalid JSON: unexpected end of input".to_string(),
        serde_json::error::Category::Data => {
            "Invalid JSON: wrong types for one or more fields".to_string()
        }
        serde_json::error::Category::Io => "Invalid JSON: I/O error while reading body".to_string(),
    }
}
