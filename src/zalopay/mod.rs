//! ZaloPay v2 merchant integration: request signing, the create/query
//! gateway calls and callback verification.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::ServiceError;

pub mod gateway;
pub mod mac;

pub use gateway::ZaloPayGateway;

const VIETNAM_UTC_OFFSET_SECS: i32 = 7 * 3600;

#[derive(Debug, Error)]
pub enum ZaloPayError {
    #[error("ZaloPay is not configured")]
    NotConfigured,

    #[error("ZaloPay request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ZaloPay returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("ZaloPay rejected the request ({return_code}): {message}")]
    Rejected { return_code: i32, message: String },

    #[error("Invalid ZaloPay payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("mac not equal")]
    InvalidMac,
}

impl From<ZaloPayError> for ServiceError {
    fn from(err: ZaloPayError) -> Self {
        match err {
            ZaloPayError::NotConfigured => {
                ServiceError::ServiceUnavailable("ZaloPay payments are not available".to_string())
            }
            ZaloPayError::InvalidMac => ServiceError::Unauthorized(err.to_string()),
            ZaloPayError::Decode(e) => ServiceError::BadRequest(e.to_string()),
            ZaloPayError::Rejected { .. } => ServiceError::PaymentFailed(err.to_string()),
            other => ServiceError::ExternalServiceError(other.to_string()),
        }
    }
}

/// Where a payment stands according to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Paid,
    Failed,
    Pending,
}

/// Merchant transaction id: `yyMMdd_<order id>_<last six digits of the
/// millisecond clock>`, dated in Vietnam time.
pub fn app_trans_id(order_id: &str, now: DateTime<Utc>) -> String {
    let local = FixedOffset::east_opt(VIETNAM_UTC_OFFSET_SECS)
        .map(|offset| now.with_timezone(&offset).format("%y%m%d").to_string())
        .unwrap_or_else(|| now.format("%y%m%d").to_string());
    let suffix = now.timestamp_millis().rem_euclid(1_000_000);
    format!("{}_{}_{:06}", local, order_id, suffix)
}

/// Order id embedded in an [`app_trans_id`].
pub fn order_id_from_app_trans_id(app_trans_id: &str) -> Option<&str> {
    let mut parts = app_trans_id.splitn(3, '_');
    let _date = parts.next()?;
    let order_id = parts.next()?;
    parts.next()?;
    (!order_id.is_empty()).then_some(order_id)
}

/// Fields posted to `/create`, minus `app_id` and `mac` which the gateway adds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderParams {
    pub app_user: String,
    pub app_trans_id: String,
    /// Milliseconds since the epoch.
    pub app_time: i64,
    /// Whole VND.
    pub amount: i64,
    /// JSON array of the order lines.
    pub item: String,
    /// JSON object; `redirecturl` sends the user back to the app.
    pub embed_data: String,
    pub description: String,
    #[serde(default)]
    pub bank_code: String,
    pub callback_url: Option<String>,
}

impl CreateOrderParams {
    /// `app_id|app_trans_id|app_user|amount|app_time|embed_data|item`
    pub fn mac_input(&self, app_id: i64) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}",
            app_id,
            self.app_trans_id,
            self.app_user,
            self.amount,
            self.app_time,
            self.embed_data,
            self.item
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    pub return_code: i32,
    #[serde(default)]
    pub return_message: String,
    #[serde(default)]
    pub sub_return_code: Option<i32>,
    #[serde(default)]
    pub sub_return_message: Option<String>,
    /// Web checkout page.
    #[serde(default)]
    pub order_url: Option<String>,
    /// Token the ZaloPay app opens the payment with.
    #[serde(default)]
    pub zp_trans_token: Option<String>,
    #[serde(default)]
    pub order_token: Option<String>,
    #[serde(default)]
    pub qr_code: Option<String>,
}

impl CreateOrderResponse {
    pub fn is_success(&self) -> bool {
        self.return_code == 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOrderResponse {
    pub return_code: i32,
    #[serde(default)]
    pub return_message: String,
    #[serde(default)]
    pub sub_return_code: Option<i32>,
    #[serde(default)]
    pub sub_return_message: Option<String>,
    #[serde(default)]
    pub is_processing: bool,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub zp_trans_id: Option<i64>,
    #[serde(default)]
    pub server_time: Option<i64>,
    #[serde(default)]
    pub discount_amount: Option<i64>,
}

impl QueryOrderResponse {
    pub fn status(&self) -> PaymentState {
        match self.return_code {
            1 if !self.is_processing => PaymentState::Paid,
            2 => PaymentState::Failed,
            _ => PaymentState::Pending,
        }
    }
}

/// Body the gateway posts to the merchant callback URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackRequest {
    /// JSON document, signed as-is.
    pub data: String,
    pub mac: String,
    #[serde(rename = "type", default)]
    pub kind: i32,
}

/// Payload of a successful payment callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackData {
    #[serde(default)]
    pub app_id: i64,
    pub app_trans_id: String,
    #[serde(default)]
    pub app_time: i64,
    #[serde(default)]
    pub app_user: String,
    pub amount: i64,
    #[serde(default)]
    pub embed_data: String,
    #[serde(default)]
    pub item: String,
    pub zp_trans_id: i64,
    #[serde(default)]
    pub server_time: i64,
    #[serde(default)]
    pub channel: i32,
    #[serde(default)]
    pub merchant_user_id: String,
    #[serde(default)]
    pub user_fee_amount: i64,
    #[serde(default)]
    pub discount_amount: i64,
}

/// Checks the callback mac against key2 and decodes its data.
pub fn verify_callback(key2: &str, request: &CallbackRequest) -> Result<CallbackData, ZaloPayError> {
    if !mac::verify(key2, &request.data, &request.mac) {
        return Err(ZaloPayError::InvalidMac);
    }
    Ok(serde_json::from_str(&request.data)?)
}

/// Decodes a raw callback body and verifies it with [`verify_callback`].
pub fn decode_callback(key2: &str, body: &[u8]) -> Result<CallbackData, ZaloPayError> {
    let request: CallbackRequest = serde_json::from_slice(body)?;
    verify_callback(key2, &request)
}

/// What the merchant answers a callback with. `return_code` 1 acknowledges,
/// -1 reports a bad mac, and 0 asks the gateway to call again later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackReply {
    pub return_code: i32,
    pub return_message: String,
}

impl CallbackReply {
    pub fn success() -> Self {
        Self {
            return_code: 1,
            return_message: "success".to_string(),
        }
    }

    pub fn mac_mismatch() -> Self {
        Self {
            return_code: -1,
            return_message: "mac not equal".to_string(),
        }
    }

    pub fn retry(message: impl Into<String>) -> Self {
        Self {
            return_code: 0,
            return_message: message.into(),
        }
    }
}
