use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    auth::AuthUser,
    entities::{product, review},
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(length(min = 1))]
    pub product_id: String,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

#[derive(Clone)]
pub struct ReviewService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl ReviewService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Reviews of a product, newest first.
    pub async fn list_for_product(&self, product_id: &str) -> Result<Vec<review::Model>, ServiceError> {
        Ok(review::Entity::find()
            .filter(review::Column::ProductId.eq(product_id))
            .order_by_desc(review::Column::CreatedAt)
            .order_by_desc(review::Column::Id)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn create(
        &self,
        customer_id: &str,
        request: CreateReviewRequest,
    ) -> Result<review::Model, ServiceError> {
        request.validate()?;
        product::Entity::find_by_id(request.product_id.clone())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", &request.product_id))?;

        let created = review::ActiveModel {
            product_id: Set(request.product_id),
            customer_id: Set(customer_id.to_string()),
            rating: Set(request.rating),
            comment: Set(request.comment),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(review_id = %created.id, "Review created");
        self.event_sender
            .send_or_log(Event::ReviewCreated {
                product_id: created.product_id.clone(),
                review_id: created.id.clone(),
            })
            .await;
        Ok(created)
    }

    /// Authors delete their own reviews; admins delete any.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn delete(&self, review_id: &str, user: &AuthUser) -> Result<(), ServiceError> {
        let existing = review::Entity::find_by_id(review_id.to_string())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Review", review_id))?;

        let is_author = user.is_customer() && existing.customer_id == user.user_id;
        if !is_author && !user.is_admin() {
            return Err(ServiceError::Forbidden(
                "Only the author or an admin can delete a review".to_string(),
            ));
        }

        existing.delete(&*self.db).await?;
        Ok(())
    }
}
