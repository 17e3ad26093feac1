use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    entities::{event, notification::NotificationKind},
    errors::ServiceError,
    events::{Event, EventSender},
    services::notifications::{notify_all_customers, NewNotification},
};

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub discount_percent: i32,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Largest discount among events running at `at`, or 0.
pub async fn best_discount_percent<C: ConnectionTrait>(
    conn: &C,
    at: DateTime<Utc>,
) -> Result<i32, ServiceError> {
    let best = event::Entity::find()
        .filter(event::Column::StartsAt.lte(at))
        .filter(event::Column::EndsAt.gte(at))
        .order_by_desc(event::Column::DiscountPercent)
        .one(conn)
        .await?;
    Ok(best.map(|e| e.discount_percent.clamp(0, 100)).unwrap_or(0))
}

/// Store promotions ("events").
#[derive(Clone)]
pub struct PromotionService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl PromotionService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    pub async fn list_active(&self, at: DateTime<Utc>) -> Result<Vec<event::Model>, ServiceError> {
        Ok(event::Entity::find()
            .filter(event::Column::StartsAt.lte(at))
            .filter(event::Column::EndsAt.gte(at))
            .order_by_asc(event::Column::EndsAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn list_all(&self) -> Result<Vec<event::Model>, ServiceError> {
        Ok(event::Entity::find()
            .order_by_desc(event::Column::StartsAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn best_discount(&self, at: DateTime<Utc>) -> Result<i32, ServiceError> {
        best_discount_percent(&*self.db, at).await
    }

    /// Creates an event and announces it to every customer.
    #[instrument(skip(self, request), fields(title = %request.title))]
    pub async fn create(&self, request: CreateEventRequest) -> Result<event::Model, ServiceError> {
        request.validate()?;
        if request.ends_at <= request.starts_at {
            return Err(ServiceError::ValidationError(
                "ends_at must be after starts_at".to_string(),
            ));
        }

        let (created, fan_out) = self
            .db
            .transaction::<_, _, ServiceError>(|txn| {
                Box::pin(async move {
                    let created = event::ActiveModel {
                        title: Set(request.title.trim().to_string()),
                        description: Set(request.description),
                        discount_percent: Set(request.discount_percent),
                        starts_at: Set(request.starts_at),
                        ends_at: Set(request.ends_at),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    let message = format!(
                        "{}% off until {}",
                        created.discount_percent,
                        created.ends_at.format("%Y-%m-%d")
                    );
                    let fan_out = notify_all_customers(
                        txn,
                        NewNotification::new(NotificationKind::Event, created.title.clone(), message)
                            .reference(created.id.clone()),
                    )
                    .await?;
                    Ok((created, fan_out))
                })
            })
            .await?;

        info!(event_id = %created.id, discount = created.discount_percent, "Promotion created");
        self.event_sender
            .send_or_log(Event::PromotionCreated {
                event_id: created.id.clone(),
                discount_percent: created.discount_percent,
            })
            .await;
        self.event_sender.send_or_log(fan_out.event()).await;
        Ok(created)
    }
}
