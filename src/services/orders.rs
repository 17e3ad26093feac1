use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::{
    auth::{AuthUser, Role},
    entities::{
        cart, cart_detail,
        notification::NotificationKind,
        order::{self, OrderStatus, PaymentMethod, PaymentStatus},
        order_detail, product,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        cart::{load_items, CartItem},
        notifications::{notify_customer, FanOut, NewNotification},
        pricing::{compute_totals, PricedLine, ShippingRules},
        promotions::best_discount_percent,
        statistics::record_delivered_order,
        store::load_settings,
    },
};

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CheckoutInput {
    #[validate(length(min = 1, max = 500))]
    pub shipping_address: String,
    #[validate(length(min = 8, max = 20))]
    pub phone: String,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
    #[serde(default = "default_payment_method")]
    pub payment_method: PaymentMethod,
}

fn default_payment_method() -> PaymentMethod {
    PaymentMethod::Cod
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderWithDetails {
    #[serde(flatten)]
    pub order: order::Model,
    pub details: Vec<order_detail::Model>,
}

/// How a payment confirmation names its order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentRef {
    OrderId(String),
    AppTransId(String),
}

fn order_notification(order: &order::Model) -> NewNotification {
    NewNotification::new(
        NotificationKind::Order,
        format!("Order {}", order.id),
        format!("Your order {} {}", order.id, order.status.label()),
    )
    .reference(order.id.clone())
}

async fn find_order<C: ConnectionTrait>(conn: &C, order_id: &str) -> Result<order::Model, ServiceError> {
    order::Entity::find_by_id(order_id.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Order", order_id))
}

async fn details_of<C: ConnectionTrait>(
    conn: &C,
    order_id: &str,
) -> Result<Vec<order_detail::Model>, ServiceError> {
    Ok(order_detail::Entity::find()
        .filter(order_detail::Column::OrderId.eq(order_id))
        .order_by_asc(order_detail::Column::ProductName)
        .order_by_asc(order_detail::Column::Id)
        .all(conn)
        .await?)
}

/// Takes `quantity` units if that many are left.
async fn take_stock(
    txn: &DatabaseTransaction,
    item: &CartItem,
) -> Result<(), ServiceError> {
    let result = product::Entity::update_many()
        .col_expr(
            product::Column::StockQuantity,
            Expr::col(product::Column::StockQuantity).sub(item.quantity),
        )
        .filter(product::Column::Id.eq(item.product_id.clone()))
        .filter(product::Column::StockQuantity.gte(item.quantity))
        .exec(txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::InsufficientStock(format!(
            "Only {} of {} left in stock",
            item.stock_quantity.max(0),
            item.product_name
        )));
    }
    Ok(())
}

async fn restore_stock(
    txn: &DatabaseTransaction,
    details: &[order_detail::Model],
) -> Result<(), ServiceError> {
    for line in details {
        product::Entity::update_many()
            .col_expr(
                product::Column::StockQuantity,
                Expr::col(product::Column::StockQuantity).add(line.quantity),
            )
            .filter(product::Column::Id.eq(line.product_id.clone()))
            .exec(txn)
            .await?;
    }
    Ok(())
}

/// Moves an order to `next` inside `txn`, applying the side effects of the
/// new status. The caller has checked who may do this.
async fn apply_transition(
    txn: &DatabaseTransaction,
    current: order::Model,
    next: OrderStatus,
    staff_id: Option<String>,
) -> Result<(order::Model, FanOut), ServiceError> {
    if !current.status.can_transition_to(next) {
        return Err(ServiceError::InvalidStatus(format!(
            "Order {} cannot move from {} to {}",
            current.id, current.status, next
        )));
    }

    let details = details_of(txn, &current.id).await?;
    if next == OrderStatus::Cancelled {
        restore_stock(txn, &details).await?;
    }

    let mut active: order::ActiveModel = current.clone().into();
    active.status = Set(next);
    if let Some(staff_id) = staff_id {
        active.staff_id = Set(Some(staff_id));
    }
    if next == OrderStatus::Delivered
        && current.payment_method == PaymentMethod::Cod
        && current.payment_status != PaymentStatus::Paid
    {
        active.payment_status = Set(PaymentStatus::Paid);
    }
    let updated = active.update(txn).await?;

    if next == OrderStatus::Delivered {
        record_delivered_order(txn, &updated, &details).await?;
    }

    let fan_out = notify_customer(txn, &updated.customer_id, order_notification(&updated)).await?;
    Ok((updated, fan_out))
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Turns the customer's cart into an order.
    ///
    /// Stock is taken, totals are priced with the best running promotion and
    /// the store's shipping rules, the cart is emptied and the customer is
    /// notified, all in one transaction.
    #[instrument(skip(self, input), fields(customer_id = %customer_id, payment_method = ?input.payment_method))]
    pub async fn checkout(
        &self,
        customer_id: &str,
        input: CheckoutInput,
    ) -> Result<OrderWithDetails, ServiceError> {
        input.validate()?;
        let customer_id = customer_id.to_string();

        let (created, cart_id, fan_out) = self
            .db
            .transaction::<_, _, ServiceError>(|txn| {
                Box::pin(async move {
                    let settings = load_settings(txn).await?;
                    if !settings.is_open {
                        return Err(ServiceError::InvalidOperation(
                            "The store is not taking orders right now".to_string(),
                        ));
                    }

                    let cart = cart::Entity::find()
                        .filter(cart::Column::CustomerId.eq(customer_id.clone()))
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::BadRequest("Cart is empty".to_string()))?;
                    let items = load_items(txn, &cart.id).await?;
                    if items.is_empty() {
                        return Err(ServiceError::BadRequest("Cart is empty".to_string()));
                    }
                    if let Some(gone) = items.iter().find(|item| !item.available) {
                        return Err(ServiceError::InvalidOperation(format!(
                            "Product {} is no longer available",
                            gone.product_id
                        )));
                    }

                    for item in &items {
                        take_stock(txn, item).await?;
                    }

                    let discount_percent = best_discount_percent(txn, Utc::now()).await?;
                    let lines: Vec<PricedLine> = items.iter().map(CartItem::priced_line).collect();
                    let totals =
                        compute_totals(&lines, discount_percent, &ShippingRules::from(&settings));

                    let order = order::ActiveModel {
                        customer_id: Set(customer_id.clone()),
                        staff_id: Set(None),
                        status: Set(OrderStatus::Pending),
                        payment_method: Set(input.payment_method),
                        payment_status: Set(PaymentStatus::Unpaid),
                        subtotal: Set(totals.subtotal),
                        discount_total: Set(totals.discount_total),
                        shipping_fee: Set(totals.shipping_fee),
                        total: Set(totals.total),
                        shipping_address: Set(input.shipping_address.trim().to_string()),
                        phone: Set(input.phone.trim().to_string()),
                        note: Set(input.note),
                        app_trans_id: Set(None),
                        zp_trans_id: Set(None),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    let mut details = Vec::with_capacity(items.len());
                    for item in &items {
                        let detail = order_detail::ActiveModel {
                            order_id: Set(order.id.clone()),
                            product_id: Set(item.product_id.clone()),
                            product_name: Set(item.product_name.clone()),
                            quantity: Set(item.quantity),
                            unit_price: Set(item.unit_price),
                            line_total: Set(item.line_total),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await?;
                        details.push(detail);
                    }

                    cart_detail::Entity::delete_many()
                        .filter(cart_detail::Column::CartId.eq(cart.id.clone()))
                        .exec(txn)
                        .await?;

                    let fan_out =
                        notify_customer(txn, &customer_id, order_notification(&order)).await?;
                    Ok((OrderWithDetails { order, details }, cart.id, fan_out))
                })
            })
            .await?;

        info!(
            order_id = %created.order.id,
            total = %created.order.total,
            lines = created.details.len(),
            "Order placed"
        );
        self.event_sender
            .send_or_log(Event::OrderCreated {
                order_id: created.order.id.clone(),
                total: created.order.total,
            })
            .await;
        self.event_sender.send_or_log(Event::CartCleared(cart_id)).await;
        self.event_sender.send_or_log(fan_out.event()).await;
        Ok(created)
    }

    pub async fn list_for_customer(
        &self,
        customer_id: &str,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let paginator = order::Entity::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }

    /// Every order, optionally with one status.
    pub async fn list_all(
        &self,
        status: Option<OrderStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let mut query = order::Entity::find();
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }
        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }

    async fn visible_order(&self, order_id: &str, user: &AuthUser) -> Result<order::Model, ServiceError> {
        let found = find_order(&*self.db, order_id).await?;
        if user.is_customer() && found.customer_id != user.user_id {
            return Err(ServiceError::Forbidden(
                "Order belongs to another customer".to_string(),
            ));
        }
        Ok(found)
    }

    /// Owners and staff can read an order.
    pub async fn get_order(&self, order_id: &str, user: &AuthUser) -> Result<OrderWithDetails, ServiceError> {
        let order = self.visible_order(order_id, user).await?;
        let details = details_of(&*self.db, order_id).await?;
        Ok(OrderWithDetails { order, details })
    }

    pub async fn list_details(
        &self,
        order_id: &str,
        user: &AuthUser,
    ) -> Result<Vec<order_detail::Model>, ServiceError> {
        self.visible_order(order_id, user).await?;
        details_of(&*self.db, order_id).await
    }

    /// Staff moves an order along its lifecycle.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn update_status(
        &self,
        order_id: &str,
        next: OrderStatus,
        actor: &AuthUser,
    ) -> Result<order::Model, ServiceError> {
        actor.require_staff()?;
        let order_id = order_id.to_string();
        let staff_id = (actor.role == Role::Staff).then(|| actor.user_id.clone());

        let (old_status, updated, fan_out) = self
            .db
            .transaction::<_, _, ServiceError>(|txn| {
                Box::pin(async move {
                    let current = find_order(txn, &order_id).await?;
                    let old_status = current.status;
                    let (updated, fan_out) = apply_transition(txn, current, next, staff_id).await?;
                    Ok((old_status, updated, fan_out))
                })
            })
            .await?;

        info!(order_id = %updated.id, from = %old_status, to = %next, "Order status updated");
        self.announce_transition(&updated, old_status, fan_out).await;
        Ok(updated)
    }

    /// Customers may cancel their own orders while they are pending.
    #[instrument(skip(self))]
    pub async fn cancel(&self, order_id: &str, customer_id: &str) -> Result<order::Model, ServiceError> {
        let order_id = order_id.to_string();
        let customer_id = customer_id.to_string();

        let (old_status, updated, fan_out) = self
            .db
            .transaction::<_, _, ServiceError>(|txn| {
                Box::pin(async move {
                    let current = find_order(txn, &order_id).await?;
                    if current.customer_id != customer_id {
                        return Err(ServiceError::Forbidden(
                            "Order belongs to another customer".to_string(),
                        ));
                    }
                    if current.status != OrderStatus::Pending {
                        return Err(ServiceError::InvalidStatus(format!(
                            "Order {} is {} and can no longer be cancelled",
                            current.id, current.status
                        )));
                    }
                    if current.payment_status == PaymentStatus::Paid {
                        return Err(ServiceError::InvalidOperation(
                            "Paid orders are cancelled by the store".to_string(),
                        ));
                    }
                    let old_status = current.status;
                    let (updated, fan_out) =
                        apply_transition(txn, current, OrderStatus::Cancelled, None).await?;
                    Ok((old_status, updated, fan_out))
                })
            })
            .await?;

        info!(order_id = %updated.id, "Order cancelled by customer");
        self.announce_transition(&updated, old_status, fan_out).await;
        Ok(updated)
    }

    async fn announce_transition(&self, updated: &order::Model, old_status: OrderStatus, fan_out: FanOut) {
        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id: updated.id.clone(),
                old_status,
                new_status: updated.status,
            })
            .await;
        if updated.status == OrderStatus::Cancelled {
            self.event_sender
                .send_or_log(Event::OrderCancelled(updated.id.clone()))
                .await;
        }
        self.event_sender.send_or_log(fan_out.event()).await;
    }

    /// Records a confirmed payment. Repeated confirmations return the order
    /// unchanged; the flag tells whether this call changed it.
    #[instrument(skip(self))]
    pub async fn mark_paid(
        &self,
        reference: PaymentRef,
        zp_trans_id: Option<String>,
    ) -> Result<(order::Model, bool), ServiceError> {
        let outcome = self
            .db
            .transaction::<_, _, ServiceError>(|txn| {
                Box::pin(async move {
                    let current = match &reference {
                        PaymentRef::OrderId(id) => find_order(txn, id).await?,
                        PaymentRef::AppTransId(app_trans_id) => order::Entity::find()
                            .filter(order::Column::AppTransId.eq(app_trans_id.clone()))
                            .one(txn)
                            .await?
                            .ok_or_else(|| ServiceError::not_found("Payment", app_trans_id))?,
                    };
                    if current.payment_status == PaymentStatus::Paid {
                        return Ok((current, None));
                    }
                    if current.status == OrderStatus::Cancelled {
                        warn!(order_id = %current.id, "Payment received for a cancelled order");
                    }

                    let mut active: order::ActiveModel = current.into();
                    active.payment_status = Set(PaymentStatus::Paid);
                    if zp_trans_id.is_some() {
                        active.zp_trans_id = Set(zp_trans_id);
                    }
                    let updated = active.update(txn).await?;

                    let fan_out = notify_customer(
                        txn,
                        &updated.customer_id,
                        NewNotification::new(
                            NotificationKind::Order,
                            format!("Order {}", updated.id),
                            format!("Payment for order {} was received", updated.id),
                        )
                        .reference(updated.id.clone()),
                    )
                    .await?;
                    Ok((updated, Some(fan_out)))
                })
            })
            .await?;

        match outcome {
            (order, Some(fan_out)) => {
                info!(order_id = %order.id, "Order marked paid");
                self.event_sender
                    .send_or_log(Event::PaymentConfirmed {
                        order_id: order.id.clone(),
                        zp_trans_id: order.zp_trans_id.clone(),
                    })
                    .await;
                self.event_sender.send_or_log(fan_out.event()).await;
                Ok((order, true))
            }
            (order, None) => Ok((order, false)),
        }
    }

    /// Flags an unpaid order whose payment the gateway rejected.
    #[instrument(skip(self))]
    pub async fn mark_payment_failed(
        &self,
        app_trans_id: &str,
        reason: &str,
    ) -> Result<order::Model, ServiceError> {
        let current = order::Entity::find()
            .filter(order::Column::AppTransId.eq(app_trans_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Payment", app_trans_id))?;
        if current.payment_status != PaymentStatus::Unpaid {
            return Ok(current);
        }

        let mut active: order::ActiveModel = current.into();
        active.payment_status = Set(PaymentStatus::Failed);
        let updated = active.update(&*self.db).await?;

        warn!(order_id = %updated.id, reason = %reason, "Payment failed");
        self.event_sender
            .send_or_log(Event::PaymentFailed {
                order_id: updated.id.clone(),
                reason: reason.to_string(),
            })
            .await;
        Ok(updated)
    }
}
