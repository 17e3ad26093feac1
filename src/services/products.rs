use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    entities::{category, notification::NotificationKind, product, review},
    errors::ServiceError,
    events::{Event, EventSender},
    services::notifications::{notify_all_customers, NewNotification},
};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProductFilter {
    pub category_id: Option<String>,
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
    /// Admin listings see deactivated products too.
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateProductRequest {
    pub category_id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub stock_quantity: i32,
    #[validate(url)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct UpdateProductRequest {
    pub category_id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock_quantity: Option<i32>,
    #[validate(url)]
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: product::Model,
    pub average_rating: Option<f64>,
    pub review_count: u64,
}

fn check_price(price: Decimal) -> Result<(), ServiceError> {
    if price.is_sign_negative() {
        return Err(ServiceError::ValidationError(
            "price must not be negative".to_string(),
        ));
    }
    Ok(())
}

/// Mean of 1..=5 ratings, two decimals.
pub fn average_rating(ratings: &[i32]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    let mean = sum as f64 / ratings.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: ProductFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let mut condition = Condition::all();
        if !filter.include_inactive {
            condition = condition.add(product::Column::IsActive.eq(true));
        }
        if let Some(category_id) = filter.category_id {
            condition = condition.add(product::Column::CategoryId.eq(category_id));
        }
        if let Some(search) = filter.search.map(|s| s.trim().to_lowercase()) {
            if !search.is_empty() {
                condition = condition.add(
                    Expr::expr(Func::lower(Expr::col(product::Column::Name)))
                        .like(format!("%{}%", search)),
                );
            }
        }

        let paginator = product::Entity::find()
            .filter(condition)
            .order_by_desc(product::Column::CreatedAt)
            .order_by_asc(product::Column::Id)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((products, total))
    }

    pub async fn find(&self, id: &str) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id.to_string())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", id))
    }

    /// Product with its rating summary. Deactivated products are only
    /// visible with `include_inactive`.
    pub async fn get(&self, id: &str, include_inactive: bool) -> Result<ProductDetail, ServiceError> {
        let product = self.find(id).await?;
        if !product.is_active && !include_inactive {
            return Err(ServiceError::not_found("Product", id));
        }

        let ratings: Vec<i32> = review::Entity::find()
            .select_only()
            .column(review::Column::Rating)
            .filter(review::Column::ProductId.eq(id))
            .into_tuple()
            .all(&*self.db)
            .await?;

        Ok(ProductDetail {
            product,
            average_rating: average_rating(&ratings),
            review_count: ratings.len() as u64,
        })
    }

    async fn ensure_category(&self, category_id: &Option<String>) -> Result<(), ServiceError> {
        if let Some(id) = category_id {
            category::Entity::find_by_id(id.clone())
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::not_found("Category", id))?;
        }
        Ok(())
    }

    /// Creates a product and tells every customer about it.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: CreateProductRequest) -> Result<product::Model, ServiceError> {
        request.validate()?;
        check_price(request.price)?;
        self.ensure_category(&request.category_id).await?;

        let (created, fan_out) = self
            .db
            .transaction::<_, _, ServiceError>(|txn| {
                Box::pin(async move {
                    let created = product::ActiveModel {
                        category_id: Set(request.category_id),
                        name: Set(request.name.trim().to_string()),
                        description: Set(request.description),
                        price: Set(request.price),
                        stock_quantity: Set(request.stock_quantity),
                        image_url: Set(request.image_url),
                        is_active: Set(true),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    let fan_out = notify_all_customers(
                        txn,
                        NewNotification::new(
                            NotificationKind::Product,
                            "New product",
                            format!("{} is now available", created.name),
                        )
                        .reference(created.id.clone()),
                    )
                    .await?;
                    Ok((created, fan_out))
                })
            })
            .await?;

        info!(product_id = %created.id, "Product created");
        self.event_sender
            .send_or_log(Event::ProductCreated(created.id.clone()))
            .await;
        self.event_sender.send_or_log(fan_out.event()).await;
        Ok(created)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: &str,
        request: UpdateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;
        if let Some(price) = request.price {
            check_price(price)?;
        }
        self.ensure_category(&request.category_id).await?;

        let mut active: product::ActiveModel = self.find(id).await?.into();
        if let Some(category_id) = request.category_id {
            active.category_id = Set(Some(category_id));
        }
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(stock) = request.stock_quantity {
            active.stock_quantity = Set(stock);
        }
        if let Some(image_url) = request.image_url {
            active.image_url = Set(Some(image_url));
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductUpdated(updated.id.clone()))
            .await;
        Ok(updated)
    }

    /// Soft delete: the row stays for order history.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: &str) -> Result<product::Model, ServiceError> {
        let existing = self.find(id).await?;
        if !existing.is_active {
            return Ok(existing);
        }
        let mut active: product::ActiveModel = existing.into();
        active.is_active = Set(false);
        let updated = active.update(&*self.db).await?;

        info!(product_id = %id, "Product deactivated");
        self.event_sender
            .send_or_log(Event::ProductDeactivated(id.to_string()))
            .await;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_rating_rounds_to_two_places() {
        assert_eq!(average_rating(&[]), None);
        assert_eq!(average_rating(&[5, 4, 4]), Some(4.33));
        assert_eq!(average_rating(&[1]), Some(1.0));
    }
}
