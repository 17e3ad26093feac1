use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use tracing::info;

use crate::{
    auth::AuthUser,
    handlers::common::validate_input,
    services::payments::{
        CreatePaymentRequest, PaymentSession, PaymentStatusView, QueryPaymentRequest,
    },
    zalopay::CallbackReply,
    ApiResponse, ApiResult, AppState,
};

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/payments/zalopay/create", post(create_zalopay_payment))
        .route("/payments/zalopay/query", post(query_zalopay_payment))
        .route("/payments/zalopay/callback", post(zalopay_callback))
}

pub async fn create_zalopay_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePaymentRequest>,
) -> ApiResult<PaymentSession> {
    let customer_id = user.require_customer()?;
    validate_input(&payload)?;
    let session = state
        .services
        .payments
        .create_payment(&payload.order_id, customer_id)
        .await?;
    Ok(Json(ApiResponse::success(session)))
}

pub async fn query_zalopay_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<QueryPaymentRequest>,
) -> ApiResult<PaymentStatusView> {
    validate_input(&payload)?;
    let status = state
        .services
        .payments
        .query_payment(&payload.app_trans_id, &user)
        .await?;
    Ok(Json(ApiResponse::success(status)))
}

/// Called by the gateway, not the app. Authenticated by the key2 mac and
/// always answered with 200 and a ZaloPay reply body.
pub async fn zalopay_callback(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<CallbackReply> {
    let reply = state.services.payments.handle_callback(&body).await;
    info!(return_code = reply.return_code, "Answered ZaloPay callback");
    Json(reply)
}
