use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::{
    entities::{
        customer, customer_notification,
        notification::{self, NotificationKind},
    },
    errors::ServiceError,
    events::Event,
    ids::generate_id,
};

/// What a new notification says and what it points at.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub reference_id: Option<String>,
}

impl NewNotification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            reference_id: None,
        }
    }

    pub fn reference(mut self, id: impl Into<String>) -> Self {
        self.reference_id = Some(id.into());
        self
    }
}

/// A notification as one customer sees it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationView {
    /// Id of the per-customer delivery row; used to mark it read.
    pub id: String,
    pub notification_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub reference_id: Option<String>,
    pub is_read: bool,
    pub read_at: Option<chrono::DateTime<Utc>>,
    pub created_at: chrono::DateTime<Utc>,
}

/// Result of a fan-out, reported after the enclosing transaction commits.
#[derive(Debug, Clone)]
pub struct FanOut {
    pub notification: notification::Model,
    pub recipients: usize,
}

impl FanOut {
    pub fn event(&self) -> Event {
        Event::NotificationFannedOut {
            notification_id: self.notification.id.clone(),
            recipients: self.recipients,
        }
    }
}

async fn insert_notification<C: ConnectionTrait>(
    conn: &C,
    new: NewNotification,
) -> Result<notification::Model, ServiceError> {
    Ok(notification::ActiveModel {
        kind: Set(new.kind),
        title: Set(new.title),
        message: Set(new.message),
        reference_id: Set(new.reference_id),
        ..Default::default()
    }
    .insert(conn)
    .await?)
}

async fn deliver<C: ConnectionTrait>(
    conn: &C,
    notification_id: &str,
    customer_ids: &[String],
) -> Result<(), ServiceError> {
    if customer_ids.is_empty() {
        return Ok(());
    }
    // insert_many skips before_save, so ids and timestamps are set here.
    let now = Utc::now();
    let rows = customer_ids.iter().map(|customer_id| customer_notification::ActiveModel {
        id: Set(generate_id()),
        notification_id: Set(notification_id.to_string()),
        customer_id: Set(customer_id.clone()),
        is_read: Set(false),
        read_at: Set(None),
        created_at: Set(now),
    });
    customer_notification::Entity::insert_many(rows)
        .exec(conn)
        .await?;
    Ok(())
}

/// Creates a notification for one customer on the given connection, which is
/// normally the transaction of the write that triggered it.
pub async fn notify_customer<C: ConnectionTrait>(
    conn: &C,
    customer_id: &str,
    new: NewNotification,
) -> Result<FanOut, ServiceError> {
    let notification = insert_notification(conn, new).await?;
    deliver(conn, &notification.id, &[customer_id.to_string()]).await?;
    Ok(FanOut {
        notification,
        recipients: 1,
    })
}

/// Creates a notification and delivers it to every customer.
pub async fn notify_all_customers<C: ConnectionTrait>(
    conn: &C,
    new: NewNotification,
) -> Result<FanOut, ServiceError> {
    let notification = insert_notification(conn, new).await?;
    let customer_ids: Vec<String> = customer::Entity::find()
        .select_only()
        .column(customer::Column::Id)
        .into_tuple()
        .all(conn)
        .await?;
    for chunk in customer_ids.chunks(500) {
        deliver(conn, &notification.id, chunk).await?;
    }
    debug!(notification_id = %notification.id, recipients = customer_ids.len(), "Notification fanned out");
    Ok(FanOut {
        recipients: customer_ids.len(),
        notification,
    })
}

/// Read side of a customer's notification inbox.
#[derive(Clone)]
pub struct NotificationService {
    db: Arc<DatabaseConnection>,
}

impl NotificationService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Customer's notifications, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_customer(
        &self,
        customer_id: &str,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<NotificationView>, u64), ServiceError> {
        let paginator = customer_notification::Entity::find()
            .filter(customer_notification::Column::CustomerId.eq(customer_id))
            .order_by_desc(customer_notification::Column::CreatedAt)
            .order_by_desc(customer_notification::Column::Id)
            .find_also_related(notification::Entity)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        let views = rows
            .into_iter()
            .filter_map(|(delivery, notification)| {
                notification.map(|n| NotificationView {
                    id: delivery.id,
                    notification_id: n.id,
                    kind: n.kind,
                    title: n.title,
                    message: n.message,
                    reference_id: n.reference_id,
                    is_read: delivery.is_read,
                    read_at: delivery.read_at,
                    created_at: delivery.created_at,
                })
            })
            .collect();

        Ok((views, total))
    }

    pub async fn unread_count(&self, customer_id: &str) -> Result<u64, ServiceError> {
        Ok(customer_notification::Entity::find()
            .filter(customer_notification::Column::CustomerId.eq(customer_id))
            .filter(customer_notification::Column::IsRead.eq(false))
            .count(&*self.db)
            .await?)
    }

    /// Marks one delivery read. Rows of other customers look missing.
    #[instrument(skip(self))]
    pub async fn mark_read(
        &self,
        customer_id: &str,
        delivery_id: &str,
    ) -> Result<customer_notification::Model, ServiceError> {
        let delivery = customer_notification::Entity::find_by_id(delivery_id.to_string())
            .filter(customer_notification::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Notification", delivery_id))?;

        if delivery.is_read {
            return Ok(delivery);
        }

        let mut active: customer_notification::ActiveModel = delivery.into();
        active.is_read = Set(true);
        active.read_at = Set(Some(Utc::now()));
        Ok(active.update(&*self.db).await?)
    }

    /// Returns how many deliveries changed.
    #[instrument(skip(self))]
    pub async fn mark_all_read(&self, customer_id: &str) -> Result<u64, ServiceError> {
        let result = customer_notification::Entity::update_many()
            .col_expr(
                customer_notification::Column::IsRead,
                sea_orm::sea_query::Expr::value(true),
            )
            .col_expr(
                customer_notification::Column::ReadAt,
                sea_orm::sea_query::Expr::value(Some(Utc::now())),
            )
            .filter(customer_notification::Column::CustomerId.eq(customer_id))
            .filter(customer_notification::Column::IsRead.eq(false))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
