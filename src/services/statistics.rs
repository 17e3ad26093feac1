use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::{
    entities::{
        customer,
        order::{self, OrderStatus},
        order_detail, product, product_statistic, revenue_statistic,
    },
    errors::ServiceError,
};

const STORE_UTC_OFFSET_SECS: i32 = 7 * 3600;

/// Calendar day in store time (UTC+7) used as the revenue bucket.
pub fn store_day(at: DateTime<Utc>) -> NaiveDate {
    let offset = FixedOffset::east_opt(STORE_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    at.with_timezone(&offset).date_naive()
}

fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Adds a delivered order to the per-product and per-day counters.
pub async fn record_delivered_order<C: ConnectionTrait>(
    conn: &C,
    order: &order::Model,
    details: &[order_detail::Model],
) -> Result<(), ServiceError> {
    for line in details {
        let existing = product_statistic::Entity::find()
            .filter(product_statistic::Column::ProductId.eq(line.product_id.clone()))
            .one(conn)
            .await?;
        match existing {
            Some(stat) => {
                let sold = stat.sold_quantity + i64::from(line.quantity);
                let revenue = stat.revenue + line.line_total;
                let mut active: product_statistic::ActiveModel = stat.into();
                active.sold_quantity = Set(sold);
                active.revenue = Set(revenue);
                active.update(conn).await?;
            }
            None => {
                product_statistic::ActiveModel {
                    product_id: Set(line.product_id.clone()),
                    sold_quantity: Set(i64::from(line.quantity)),
                    revenue: Set(line.line_total),
                    ..Default::default()
                }
                .insert(conn)
                .await?;
            }
        }
    }

    let day = day_key(store_day(Utc::now()));
    let existing = revenue_statistic::Entity::find()
        .filter(revenue_statistic::Column::Day.eq(day.clone()))
        .one(conn)
        .await?;
    match existing {
        Some(stat) => {
            let count = stat.order_count + 1;
            let revenue = stat.revenue + order.total;
            let mut active: revenue_statistic::ActiveModel = stat.into();
            active.order_count = Set(count);
            active.revenue = Set(revenue);
            active.update(conn).await?;
        }
        None => {
            revenue_statistic::ActiveModel {
                day: Set(day.clone()),
                order_count: Set(1),
                revenue: Set(order.total),
                ..Default::default()
            }
            .insert(conn)
            .await?;
        }
    }

    debug!(order_id = %order.id, day = %day, "Statistics recorded");
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dashboard {
    pub customer_count: u64,
    pub product_count: u64,
    pub order_count: u64,
    pub pending_order_count: u64,
    pub total_revenue: Decimal,
    pub today_revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductSales {
    pub product_id: String,
    pub product_name: Option<String>,
    pub sold_quantity: i64,
    pub revenue: Decimal,
}

#[derive(Clone)]
pub struct StatisticsService {
    db: Arc<DatabaseConnection>,
}

impl StatisticsService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<Dashboard, ServiceError> {
        let customer_count = customer::Entity::find().count(&*self.db).await?;
        let product_count = product::Entity::find()
            .filter(product::Column::IsActive.eq(true))
            .count(&*self.db)
            .await?;
        let order_count = order::Entity::find().count(&*self.db).await?;
        let pending_order_count = order::Entity::find()
            .filter(order::Column::Status.eq(OrderStatus::Pending))
            .count(&*self.db)
            .await?;

        let total_revenue = self.revenue_sum(None).await?;
        let today = day_key(store_day(Utc::now()));
        let today_revenue = self.revenue_sum(Some(&today)).await?;

        Ok(Dashboard {
            customer_count,
            product_count,
            order_count,
            pending_order_count,
            total_revenue,
            today_revenue,
        })
    }

    /// Revenue over every recorded day, or over `day` alone.
    async fn revenue_sum(&self, day: Option<&str>) -> Result<Decimal, ServiceError> {
        let mut query = revenue_statistic::Entity::find()
            .select_only()
            .column_as(Expr::col(revenue_statistic::Column::Revenue).sum(), "total");
        if let Some(day) = day {
            query = query.filter(revenue_statistic::Column::Day.eq(day));
        }
        Ok(query
            .into_tuple::<Option<Decimal>>()
            .one(&*self.db)
            .await?
            .flatten()
            .unwrap_or(Decimal::ZERO))
    }

    /// Best sellers by quantity.
    pub async fn product_statistics(&self, limit: u64) -> Result<Vec<ProductSales>, ServiceError> {
        let rows = product_statistic::Entity::find()
            .order_by_desc(product_statistic::Column::SoldQuantity)
            .order_by_desc(product_statistic::Column::Revenue)
            .limit(limit.clamp(1, 100))
            .find_also_related(product::Entity)
            .all(&*self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(stat, product)| ProductSales {
                product_id: stat.product_id,
                product_name: product.map(|p| p.name),
                sold_quantity: stat.sold_quantity,
                revenue: stat.revenue,
            })
            .collect())
    }

    /// Per-day rows with `from <= day <= to`.
    pub async fn revenue_statistics(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<revenue_statistic::Model>, ServiceError> {
        if to < from {
            return Err(ServiceError::ValidationError(
                "`to` must not be before `from`".to_string(),
            ));
        }
        Ok(revenue_statistic::Entity::find()
            .filter(revenue_statistic::Column::Day.gte(day_key(from)))
            .filter(revenue_statistic::Column::Day.lte(day_key(to)))
            .order_by_asc(revenue_statistic::Column::Day)
            .all(&*self.db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn store_day_rolls_over_at_utc_plus_seven() {
        let late_utc = Utc.with_ymd_and_hms(2024, 3, 1, 17, 30, 0).unwrap();
        assert_eq!(store_day(late_utc), NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        let early_utc = Utc.with_ymd_and_hms(2024, 3, 1, 16, 59, 0).unwrap();
        assert_eq!(store_day(early_utc), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[tokio::test]
    async fn dashboard_sums_revenue_in_the_database() {
        let db = crate::db::establish_connection_with_config(&crate::db::DbConfig::in_memory())
            .await
            .unwrap();
        crate::db::run_migrations(&db).await.unwrap();
        let service = StatisticsService::new(Arc::new(db));

        let empty = service.dashboard().await.unwrap();
        assert_eq!(empty.total_revenue, Decimal::ZERO);
        assert_eq!(empty.today_revenue, Decimal::ZERO);

        let today = day_key(store_day(Utc::now()));
        for (day, revenue) in [
            ("2024-01-02".to_string(), 120_000),
            ("2024-01-03".to_string(), 80_000),
            (today, 45_000),
        ] {
            revenue_statistic::ActiveModel {
                day: Set(day),
                order_count: Set(1),
                revenue: Set(Decimal::from(revenue)),
                ..Default::default()
            }
            .insert(&*service.db)
            .await
            .unwrap();
        }

        let dashboard = service.dashboard().await.unwrap();
        assert_eq!(dashboard.total_revenue, Decimal::from(245_000));
        assert_eq!(dashboard.today_revenue, Decimal::from(45_000));
    }
}
