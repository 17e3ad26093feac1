use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    entities::{cart, cart_detail, product},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        pricing::{compute_totals, line_total, OrderTotals, PricedLine, ShippingRules},
        promotions::best_discount_percent,
        store::load_settings,
    },
};

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct AddCartDetailRequest {
    #[validate(length(min = 1))]
    pub cart_id: String,
    #[validate(length(min = 1))]
    pub product_id: String,
    #[validate(range(min = 1, max = 1000))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct UpdateCartDetailRequest {
    /// Zero removes the line.
    #[validate(range(min = 0, max = 1000))]
    pub quantity: i32,
}

/// A cart line joined with its product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartItem {
    pub id: String,
    pub cart_id: String,
    pub product_id: String,
    pub product_name: String,
    pub image_url: Option<String>,
    pub quantity: i32,
    /// Current product price; checkout charges this.
    pub unit_price: Decimal,
    /// Price when the line was last changed.
    pub added_unit_price: Decimal,
    pub line_total: Decimal,
    pub stock_quantity: i32,
    /// False once the product is deactivated; such lines block checkout.
    pub available: bool,
}

impl CartItem {
    fn from_parts(detail: cart_detail::Model, product: Option<product::Model>) -> Self {
        match product {
            Some(p) => Self {
                line_total: line_total(p.price, detail.quantity),
                id: detail.id,
                cart_id: detail.cart_id,
                product_id: detail.product_id,
                product_name: p.name,
                image_url: p.image_url,
                quantity: detail.quantity,
                unit_price: p.price,
                added_unit_price: detail.unit_price,
                stock_quantity: p.stock_quantity,
                available: p.is_active,
            },
            None => Self {
                line_total: Decimal::ZERO,
                id: detail.id,
                cart_id: detail.cart_id,
                product_id: detail.product_id,
                product_name: String::new(),
                image_url: None,
                quantity: detail.quantity,
                unit_price: detail.unit_price,
                added_unit_price: detail.unit_price,
                stock_quantity: 0,
                available: false,
            },
        }
    }

    pub fn priced_line(&self) -> PricedLine {
        PricedLine::new(self.unit_price, self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartView {
    pub cart: cart::Model,
    pub items: Vec<CartItem>,
    pub discount_percent: i32,
    pub totals: OrderTotals,
}

/// Lines of a cart with their products, oldest first.
pub async fn load_items<C: ConnectionTrait>(
    conn: &C,
    cart_id: &str,
) -> Result<Vec<CartItem>, ServiceError> {
    let rows = cart_detail::Entity::find()
        .filter(cart_detail::Column::CartId.eq(cart_id))
        .order_by_asc(cart_detail::Column::CreatedAt)
        .order_by_asc(cart_detail::Column::Id)
        .find_also_related(product::Entity)
        .all(conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(detail, product)| CartItem::from_parts(detail, product))
        .collect())
}

fn check_stock(product: &product::Model, quantity: i32) -> Result<(), ServiceError> {
    if quantity > product.stock_quantity {
        return Err(ServiceError::InsufficientStock(format!(
            "Only {} of {} left in stock",
            product.stock_quantity.max(0),
            product.name
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// The customer's cart, created on first use.
    #[instrument(skip(self))]
    pub async fn get_or_create_cart(&self, customer_id: &str) -> Result<cart::Model, ServiceError> {
        if let Some(existing) = cart::Entity::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?
        {
            return Ok(existing);
        }

        let created = cart::ActiveModel {
            customer_id: Set(customer_id.to_string()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;
        info!(cart_id = %created.id, "Cart created");
        Ok(created)
    }

    async fn owned_cart(&self, cart_id: &str, customer_id: &str) -> Result<cart::Model, ServiceError> {
        let found = cart::Entity::find_by_id(cart_id.to_string())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Cart", cart_id))?;
        if found.customer_id != customer_id {
            return Err(ServiceError::Forbidden(
                "Cart belongs to another customer".to_string(),
            ));
        }
        Ok(found)
    }

    async fn owned_detail(
        &self,
        detail_id: &str,
        customer_id: &str,
    ) -> Result<cart_detail::Model, ServiceError> {
        let detail = cart_detail::Entity::find_by_id(detail_id.to_string())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Cart detail", detail_id))?;
        self.owned_cart(&detail.cart_id, customer_id).await?;
        Ok(detail)
    }

    async fn active_product(&self, product_id: &str) -> Result<product::Model, ServiceError> {
        let found = product::Entity::find_by_id(product_id.to_string())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))?;
        if !found.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "{} is no longer available",
                found.name
            )));
        }
        Ok(found)
    }

    /// Cart with priced lines and totals under today's promotion.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, cart_id: &str, customer_id: &str) -> Result<CartView, ServiceError> {
        let cart = self.owned_cart(cart_id, customer_id).await?;
        let items = load_items(&*self.db, cart_id).await?;
        let settings = load_settings(&*self.db).await?;
        let discount_percent = best_discount_percent(&*self.db, Utc::now()).await?;

        let lines: Vec<PricedLine> = items
            .iter()
            .filter(|item| item.available)
            .map(CartItem::priced_line)
            .collect();
        let totals = compute_totals(&lines, discount_percent, &ShippingRules::from(&settings));

        Ok(CartView {
            cart,
            items,
            discount_percent,
            totals,
        })
    }

    pub async fn list_details(
        &self,
        cart_id: &str,
        customer_id: &str,
    ) -> Result<Vec<CartItem>, ServiceError> {
        self.owned_cart(cart_id, customer_id).await?;
        load_items(&*self.db, cart_id).await
    }

    /// Adds a product; a line that already holds it is incremented.
    #[instrument(skip(self, request), fields(cart_id = %request.cart_id, product_id = %request.product_id))]
    pub async fn add_detail(
        &self,
        customer_id: &str,
        request: AddCartDetailRequest,
    ) -> Result<cart_detail::Model, ServiceError> {
        request.validate()?;
        self.owned_cart(&request.cart_id, customer_id).await?;
        let product = self.active_product(&request.product_id).await?;

        let existing = cart_detail::Entity::find()
            .filter(cart_detail::Column::CartId.eq(request.cart_id.clone()))
            .filter(cart_detail::Column::ProductId.eq(request.product_id.clone()))
            .one(&*self.db)
            .await?;

        let saved = match existing {
            Some(line) => {
                let quantity = line.quantity.saturating_add(request.quantity);
                check_stock(&product, quantity)?;
                let mut active: cart_detail::ActiveModel = line.into();
                active.quantity = Set(quantity);
                active.unit_price = Set(product.price);
                active.update(&*self.db).await?
            }
            None => {
                check_stock(&product, request.quantity)?;
                cart_detail::ActiveModel {
                    cart_id: Set(request.cart_id.clone()),
                    product_id: Set(request.product_id.clone()),
                    quantity: Set(request.quantity),
                    unit_price: Set(product.price),
                    ..Default::default()
                }
                .insert(&*self.db)
                .await?
            }
        };

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: saved.cart_id.clone(),
                product_id: saved.product_id.clone(),
            })
            .await;
        Ok(saved)
    }

    /// Sets a line's quantity. Returns `None` when quantity 0 removed it.
    #[instrument(skip(self))]
    pub async fn update_detail(
        &self,
        customer_id: &str,
        detail_id: &str,
        request: UpdateCartDetailRequest,
    ) -> Result<Option<cart_detail::Model>, ServiceError> {
        request.validate()?;
        let detail = self.owned_detail(detail_id, customer_id).await?;

        if request.quantity == 0 {
            let cart_id = detail.cart_id.clone();
            detail.delete(&*self.db).await?;
            self.event_sender
                .send_or_log(Event::CartItemRemoved {
                    cart_id,
                    detail_id: detail_id.to_string(),
                })
                .await;
            return Ok(None);
        }

        let product = self.active_product(&detail.product_id).await?;
        check_stock(&product, request.quantity)?;

        let mut active: cart_detail::ActiveModel = detail.into();
        active.quantity = Set(request.quantity);
        active.unit_price = Set(product.price);
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartItemUpdated {
                cart_id: updated.cart_id.clone(),
                detail_id: updated.id.clone(),
            })
            .await;
        Ok(Some(updated))
    }

    #[instrument(skip(self))]
    pub async fn remove_detail(&self, customer_id: &str, detail_id: &str) -> Result<(), ServiceError> {
        let detail = self.owned_detail(detail_id, customer_id).await?;
        let cart_id = detail.cart_id.clone();
        detail.delete(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                cart_id,
                detail_id: detail_id.to_string(),
            })
            .await;
        Ok(())
    }

    /// Empties the cart; returns how many lines were removed.
    #[instrument(skip(self))]
    pub async fn clear(&self, customer_id: &str, cart_id: &str) -> Result<u64, ServiceError> {
        self.owned_cart(cart_id, customer_id).await?;
        let result = cart_detail::Entity::delete_many()
            .filter(cart_detail::Column::CartId.eq(cart_id))
            .exec(&*self.db)
            .await?;

        self.event_sender
            .send_or_log(Event::CartCleared(cart_id.to_string()))
            .await;
        Ok(result.rows_affected)
    }
}
