use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use crate::{
    entities::{product, product_favorite},
    errors::ServiceError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteState {
    pub is_favorite: bool,
}

#[derive(Clone)]
pub struct FavoriteService {
    db: Arc<DatabaseConnection>,
}

impl FavoriteService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Favorited products, most recent first.
    pub async fn list(&self, customer_id: &str) -> Result<Vec<product::Model>, ServiceError> {
        Ok(product::Entity::find()
            .join_rev(JoinType::InnerJoin, product_favorite::Relation::Product.def())
            .filter(product_favorite::Column::CustomerId.eq(customer_id))
            .order_by_desc(product_favorite::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Adds the product if absent, removes it if present.
    #[instrument(skip(self))]
    pub async fn toggle(
        &self,
        customer_id: &str,
        product_id: &str,
    ) -> Result<FavoriteState, ServiceError> {
        product::Entity::find_by_id(product_id.to_string())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))?;

        let existing = product_favorite::Entity::find()
            .filter(product_favorite::Column::CustomerId.eq(customer_id))
            .filter(product_favorite::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?;

        match existing {
            Some(favorite) => {
                favorite.delete(&*self.db).await?;
                Ok(FavoriteState { is_favorite: false })
            }
            None => {
                product_favorite::ActiveModel {
                    customer_id: Set(customer_id.to_string()),
                    product_id: Set(product_id.to_string()),
                    ..Default::default()
                }
                .insert(&*self.db)
                .await?;
                Ok(FavoriteState { is_favorite: true })
            }
        }
    }
}
