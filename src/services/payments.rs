use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use validator::Validate;

use crate::{
    auth::AuthUser,
    entities::{
        order::{self, OrderStatus, PaymentMethod, PaymentStatus},
        order_detail,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        orders::{OrderService, PaymentRef},
        pricing::to_minor_units,
    },
    zalopay::{
        app_trans_id, decode_callback, order_id_from_app_trans_id, CallbackReply,
        CreateOrderParams, PaymentState, ZaloPayError, ZaloPayGateway,
    },
};

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreatePaymentRequest {
    #[validate(length(min = 1))]
    pub order_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct QueryPaymentRequest {
    #[validate(length(min = 1, max = 40))]
    pub app_trans_id: String,
}

/// What the app needs to open ZaloPay and then poll for the result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentSession {
    pub order_id: String,
    pub app_trans_id: String,
    pub amount: i64,
    pub order_url: Option<String>,
    pub zp_trans_token: Option<String>,
    pub qr_code: Option<String>,
    pub poll_interval_secs: u64,
    pub expires_in_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentStatusView {
    pub order_id: String,
    pub app_trans_id: String,
    pub status: PaymentState,
    pub return_code: i32,
    pub return_message: String,
    pub zp_trans_id: Option<String>,
}

fn item_json(details: &[order_detail::Model]) -> String {
    let items: Vec<_> = details
        .iter()
        .map(|line| {
            json!({
                "itemid": line.product_id,
                "itemname": line.product_name,
                "itemprice": to_minor_units(line.unit_price),
                "itemquantity": line.quantity,
            })
        })
        .collect();
    serde_json::Value::Array(items).to_string()
}

fn embed_json(redirect_url: Option<&str>) -> String {
    match redirect_url {
        Some(url) => json!({ "redirecturl": url }).to_string(),
        None => "{}".to_string(),
    }
}

/// ZaloPay checkout for orders placed with `payment_method = zalopay`.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    gateway: Arc<ZaloPayGateway>,
    orders: OrderService,
    event_sender: EventSender,
}

impl PaymentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: Arc<ZaloPayGateway>,
        orders: OrderService,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db,
            gateway,
            orders,
            event_sender,
        }
    }

    /// Opens a gateway session for an unpaid order of the caller.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn create_payment(
        &self,
        order_id: &str,
        customer_id: &str,
    ) -> Result<PaymentSession, ServiceError> {
        let order = order::Entity::find_by_id(order_id.to_string())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", order_id))?;
        if order.customer_id != customer_id {
            return Err(ServiceError::Forbidden(
                "Order belongs to another customer".to_string(),
            ));
        }
        if order.payment_method != PaymentMethod::Zalopay {
            return Err(ServiceError::InvalidOperation(
                "Order is not paid with ZaloPay".to_string(),
            ));
        }
        if order.status == OrderStatus::Cancelled {
            return Err(ServiceError::InvalidOperation(
                "Order has been cancelled".to_string(),
            ));
        }
        if order.payment_status == PaymentStatus::Paid {
            return Err(ServiceError::Conflict("Order is already paid".to_string()));
        }

        let details = order_detail::Entity::find()
            .filter(order_detail::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;

        let now = Utc::now();
        let config = self.gateway.config();
        let params = CreateOrderParams {
            app_user: order.customer_id.clone(),
            app_trans_id: app_trans_id(&order.id, now),
            app_time: now.timestamp_millis(),
            amount: to_minor_units(order.total),
            item: item_json(&details),
            embed_data: embed_json(config.redirect_url.as_deref()),
            description: format!("Storefront - Payment for order #{}", order.id),
            bank_code: String::new(),
            callback_url: None,
        };

        let response = self.gateway.create_order(&params).await?;

        let mut active: order::ActiveModel = order.into();
        active.app_trans_id = Set(Some(params.app_trans_id.clone()));
        // A failed attempt is retried with a fresh session.
        active.payment_status = Set(PaymentStatus::Unpaid);
        active.update(&*self.db).await?;

        info!(app_trans_id = %params.app_trans_id, amount = params.amount, "Payment session created");
        self.event_sender
            .send_or_log(Event::PaymentSessionCreated {
                order_id: order_id.to_string(),
                app_trans_id: params.app_trans_id.clone(),
            })
            .await;

        Ok(PaymentSession {
            order_id: order_id.to_string(),
            app_trans_id: params.app_trans_id,
            amount: params.amount,
            order_url: response.order_url,
            zp_trans_token: response.zp_trans_token,
            qr_code: response.qr_code,
            poll_interval_secs: config.poll_interval_secs,
            expires_in_secs: config.payment_timeout_secs,
        })
    }

    /// Asks the gateway about a session and records a final result.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn query_payment(
        &self,
        app_trans_id: &str,
        user: &AuthUser,
    ) -> Result<PaymentStatusView, ServiceError> {
        let order = order::Entity::find()
            .filter(order::Column::AppTransId.eq(app_trans_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Payment", app_trans_id))?;
        if user.is_customer() && order.customer_id != user.user_id {
            return Err(ServiceError::Forbidden(
                "Order belongs to another customer".to_string(),
            ));
        }

        let response = self.gateway.query_order(app_trans_id).await?;
        let status = response.status();
        let zp_trans_id = response.zp_trans_id.map(|id| id.to_string());

        match status {
            PaymentState::Paid => {
                self.orders
                    .mark_paid(
                        PaymentRef::AppTransId(app_trans_id.to_string()),
                        zp_trans_id.clone(),
                    )
                    .await?;
            }
            PaymentState::Failed => {
                self.orders
                    .mark_payment_failed(app_trans_id, &response.return_message)
                    .await?;
            }
            PaymentState::Pending => {}
        }

        Ok(PaymentStatusView {
            order_id: order.id,
            app_trans_id: app_trans_id.to_string(),
            status,
            return_code: response.return_code,
            return_message: response.return_message,
            zp_trans_id,
        })
    }

    /// Handles the gateway's server-to-server payment notification.
    #[instrument(skip(self, body))]
    pub async fn handle_callback(&self, body: &[u8]) -> CallbackReply {
        let config = self.gateway.config();
        if !config.is_configured() {
            warn!("ZaloPay callback received but ZaloPay is not configured");
            return CallbackReply::retry("merchant not configured");
        }

        let data = match decode_callback(&config.key2, body) {
            Ok(data) => data,
            Err(ZaloPayError::InvalidMac) => {
                warn!("ZaloPay callback with invalid mac");
                return CallbackReply::mac_mismatch();
            }
            Err(err) => {
                warn!(error = %err, "Undecodable ZaloPay callback");
                return CallbackReply::retry(err.to_string());
            }
        };

        let order = match self.callback_order(&data.app_trans_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                warn!(app_trans_id = %data.app_trans_id, "Callback for unknown transaction");
                return CallbackReply::retry("unknown app_trans_id");
            }
            Err(err) => {
                error!(error = %err, "Callback lookup failed");
                return CallbackReply::retry(err.to_string());
            }
        };

        let expected = to_minor_units(order.total);
        if data.amount != expected {
            error!(
                order_id = %order.id,
                paid = data.amount,
                expected,
                "Callback amount does not match order total"
            );
            return CallbackReply::retry("amount mismatch");
        }

        match self
            .orders
            .mark_paid(
                PaymentRef::OrderId(order.id.clone()),
                Some(data.zp_trans_id.to_string()),
            )
            .await
        {
            Ok(_) => CallbackReply::success(),
            Err(err) => {
                error!(error = %err, order_id = %order.id, "Could not record callback payment");
                CallbackReply::retry(err.to_string())
            }
        }
    }

    /// Order a callback pays for. A newer session replaces the stored
    /// `app_trans_id`, so an earlier one is resolved through the order id it
    /// embeds.
    async fn callback_order(&self, app_trans_id: &str) -> Result<Option<order::Model>, DbErr> {
        let current = order::Entity::find()
            .filter(order::Column::AppTransId.eq(app_trans_id))
            .one(&*self.db)
            .await?;
        if current.is_some() {
            return Ok(current);
        }

        match order_id_from_app_trans_id(app_trans_id) {
            Some(order_id) => {
                let order = order::Entity::find_by_id(order_id.to_string())
                    .one(&*self.db)
                    .await?;
                if order.is_some() {
                    info!(app_trans_id, order_id, "Callback for an earlier payment session");
                }
                Ok(order)
            }
            None => Ok(None),
        }
    }
}
