use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    entities::{category, product},
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    pub async fn list(&self) -> Result<Vec<category::Model>, ServiceError> {
        Ok(category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn get(&self, id: &str) -> Result<category::Model, ServiceError> {
        category::Entity::find_by_id(id.to_string())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Category", id))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: CategoryInput) -> Result<category::Model, ServiceError> {
        input.validate()?;
        let created = category::ActiveModel {
            name: Set(input.name.trim().to_string()),
            description: Set(input.description),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(category_id = %created.id, "Category created");
        self.event_sender
            .send_or_log(Event::CategoryCreated(created.id.clone()))
            .await;
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: &str,
        input: CategoryInput,
    ) -> Result<category::Model, ServiceError> {
        input.validate()?;
        let mut active: category::ActiveModel = self.get(id).await?.into();
        active.name = Set(input.name.trim().to_string());
        active.description = Set(input.description);
        Ok(active.update(&*self.db).await?)
    }

    /// Deletes an unused category; 409 while products still point at it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;
        let in_use = product::Entity::find()
            .filter(product::Column::CategoryId.eq(id))
            .count(&*self.db)
            .await?;
        if in_use > 0 {
            return Err(ServiceError::Conflict(format!(
                "Category {} still has {} products",
                id, in_use
            )));
        }

        existing.delete(&*self.db).await?;
        info!(category_id = %id, "Category deleted");
        self.event_sender
            .send_or_log(Event::CategoryDeleted(id.to_string()))
            .await;
        Ok(())
    }
}
