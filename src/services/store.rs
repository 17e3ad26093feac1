use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    entities::{store, store_setting},
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreInfo {
    pub store: store::Model,
    pub settings: store_setting::Model,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct UpdateStoreSettings {
    pub shipping_fee: Option<Decimal>,
    pub free_shipping_threshold: Option<Decimal>,
    #[validate(length(min = 3, max = 3))]
    pub currency: Option<String>,
    pub is_open: Option<bool>,
}

/// Settings row of the (single) store.
pub async fn load_settings<C: ConnectionTrait>(
    conn: &C,
) -> Result<store_setting::Model, ServiceError> {
    store_setting::Entity::find()
        .order_by_asc(store_setting::Column::Id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::ServiceUnavailable("Store is not configured".to_string()))
}

#[derive(Clone)]
pub struct StoreService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl StoreService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    pub async fn get_store(&self) -> Result<StoreInfo, ServiceError> {
        let settings = load_settings(&*self.db).await?;
        let store = store::Entity::find_by_id(settings.store_id.clone())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Store", &settings.store_id))?;
        Ok(StoreInfo { store, settings })
    }

    pub async fn settings(&self) -> Result<store_setting::Model, ServiceError> {
        load_settings(&*self.db).await
    }

    #[instrument(skip(self, input))]
    pub async fn update_settings(
        &self,
        input: UpdateStoreSettings,
    ) -> Result<store_setting::Model, ServiceError> {
        input.validate()?;
        for (field, amount) in [
            ("shipping_fee", input.shipping_fee),
            ("free_shipping_threshold", input.free_shipping_threshold),
        ] {
            if amount.is_some_and(|a| a.is_sign_negative()) {
                return Err(ServiceError::ValidationError(format!(
                    "{} must not be negative",
                    field
                )));
            }
        }

        let current = load_settings(&*self.db).await?;
        let mut active: store_setting::ActiveModel = current.into();
        if let Some(fee) = input.shipping_fee {
            active.shipping_fee = Set(fee);
        }
        if let Some(threshold) = input.free_shipping_threshold {
            active.free_shipping_threshold = Set(threshold);
        }
        if let Some(currency) = input.currency {
            active.currency = Set(currency.to_uppercase());
        }
        if let Some(is_open) = input.is_open {
            active.is_open = Set(is_open);
        }
        let updated = active.update(&*self.db).await?;

        info!(store_id = %updated.store_id, "Store settings updated");
        self.event_sender
            .send_or_log(Event::StoreSettingsUpdated(updated.store_id.clone()))
            .await;
        Ok(updated)
    }
}
