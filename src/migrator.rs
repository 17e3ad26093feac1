use rust_decimal_macros::dec;
use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_account_tables::Migration),
            Box::new(m20240101_000002_create_catalog_tables::Migration),
            Box::new(m20240101_000003_create_cart_and_order_tables::Migration),
            Box::new(m20240101_000004_create_notification_and_statistic_tables::Migration),
            Box::new(m20240101_000005_seed_default_store::Migration),
        ]
    }
}

/// Default checkout settings written by the seed migration.
pub const DEFAULT_SHIPPING_FEE: rust_decimal::Decimal = dec!(30000);
pub const DEFAULT_FREE_SHIPPING_THRESHOLD: rust_decimal::Decimal = dec!(500000);

mod m20240101_000001_create_account_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_account_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Customers::Id).string_len(8).primary_key().not_null())
                        .col(ColumnDef::new(Customers::Name).string().not_null())
                        .col(ColumnDef::new(Customers::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Customers::Phone).string().null())
                        .col(ColumnDef::new(Customers::Address).string().null())
                        .col(ColumnDef::new(Customers::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Customers::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Customers::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Stores::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Stores::Id).string_len(8).primary_key().not_null())
                        .col(ColumnDef::new(Stores::Name).string().not_null())
                        .col(ColumnDef::new(Stores::Address).string().null())
                        .col(ColumnDef::new(Stores::Phone).string().null())
                        .col(ColumnDef::new(Stores::Email).string().null())
                        .col(ColumnDef::new(Stores::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Stores::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StoreSettings::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(StoreSettings::Id).string_len(8).primary_key().not_null())
                        .col(ColumnDef::new(StoreSettings::StoreId).string_len(8).not_null())
                        .col(
                            ColumnDef::new(StoreSettings::ShippingFee)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StoreSettings::FreeShippingThreshold)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(StoreSettings::Currency).string_len(3).not_null())
                        .col(
                            ColumnDef::new(StoreSettings::IsOpen)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(StoreSettings::UpdatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_store_settings_store_id")
                                .from(StoreSettings::Table, StoreSettings::StoreId)
                                .to(Stores::Table, Stores::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Staff::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Staff::Id).string_len(8).primary_key().not_null())
                        .col(ColumnDef::new(Staff::StoreId).string_len(8).null())
                        .col(ColumnDef::new(Staff::Name).string().not_null())
                        .col(ColumnDef::new(Staff::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Staff::Phone).string().null())
                        .col(ColumnDef::new(Staff::PasswordHash).string().not_null())
                        .col(
                            ColumnDef::new(Staff::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Staff::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Staff::UpdatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_staff_store_id")
                                .from(Staff::Table, Staff::StoreId)
                                .to(Stores::Table, Stores::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Admins::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Admins::Id).string_len(8).primary_key().not_null())
                        .col(ColumnDef::new(Admins::Name).string().not_null())
                        .col(ColumnDef::new(Admins::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Admins::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Admins::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Admins::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Admins::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Staff::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StoreSettings::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Stores::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Customers {
        Table,
        Id,
        Name,
        Email,
        Phone,
        Address,
        PasswordHash,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub enum Stores {
        Table,
        Id,
        Name,
        Address,
        Phone,
        Email,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum StoreSettings {
        Table,
        Id,
        StoreId,
        ShippingFee,
        FreeShippingThreshold,
        Currency,
        IsOpen,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub enum Staff {
        Table,
        Id,
        StoreId,
        Name,
        Email,
        Phone,
        PasswordHash,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Admins {
        Table,
        Id,
        Name,
        Email,
        PasswordHash,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_catalog_tables {
    use super::m20240101_000001_create_account_tables::Customers;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Categories::Id).string_len(8).primary_key().not_null())
                        .col(ColumnDef::new(Categories::Name).string().not_null())
                        .col(ColumnDef::new(Categories::Description).string().null())
                        .col(ColumnDef::new(Categories::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Categories::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).string_len(8).primary_key().not_null())
                        .col(ColumnDef::new(Products::CategoryId).string_len(8).null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Description).text().null())
                        .col(ColumnDef::new(Products::Price).decimal().not_null())
                        .col(
                            ColumnDef::new(Products::StockQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::ImageUrl).string().null())
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Products::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_category_id")
                                .from(Products::Table, Products::CategoryId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_category_id")
                        .table(Products::Table)
                        .col(Products::CategoryId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductFavorites::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ProductFavorites::Id).string_len(8).primary_key().not_null())
                        .col(ColumnDef::new(ProductFavorites::CustomerId).string_len(8).not_null())
                        .col(ColumnDef::new(ProductFavorites::ProductId).string_len(8).not_null())
                        .col(ColumnDef::new(ProductFavorites::CreatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_favorites_customer_id")
                                .from(ProductFavorites::Table, ProductFavorites::CustomerId)
                                .to(Customers::Table, Customers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_favorites_product_id")
                                .from(ProductFavorites::Table, ProductFavorites::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_favorites_customer_product")
                        .table(ProductFavorites::Table)
                        .col(ProductFavorites::CustomerId)
                        .col(ProductFavorites::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Reviews::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Reviews::Id).string_len(8).primary_key().not_null())
                        .col(ColumnDef::new(Reviews::ProductId).string_len(8).not_null())
                        .col(ColumnDef::new(Reviews::CustomerId).string_len(8).not_null())
                        .col(ColumnDef::new(Reviews::Rating).integer().not_null())
                        .col(ColumnDef::new(Reviews::Comment).text().null())
                        .col(ColumnDef::new(Reviews::CreatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_reviews_product_id")
                                .from(Reviews::Table, Reviews::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_reviews_customer_id")
                                .from(Reviews::Table, Reviews::CustomerId)
                                .to(Customers::Table, Customers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_reviews_product_id")
                        .table(Reviews::Table)
                        .col(Reviews::ProductId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Events::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Events::Id).string_len(8).primary_key().not_null())
                        .col(ColumnDef::new(Events::Title).string().not_null())
                        .col(ColumnDef::new(Events::Description).text().null())
                        .col(
                            ColumnDef::new(Events::DiscountPercent)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Events::StartsAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Events::EndsAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Events::CreatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Events::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Reviews::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductFavorites::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Categories {
        Table,
        Id,
        Name,
        Description,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub enum Products {
        Table,
        Id,
        CategoryId,
        Name,
        Description,
        Price,
        StockQuantity,
        ImageUrl,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductFavorites {
        Table,
        Id,
        CustomerId,
        ProductId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Reviews {
        Table,
        Id,
        ProductId,
        CustomerId,
        Rating,
        Comment,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Events {
        Table,
        Id,
        Title,
        Description,
        DiscountPercent,
        StartsAt,
        EndsAt,
        CreatedAt,
    }
}

mod m20240101_000003_create_cart_and_order_tables {
    use super::m20240101_000001_create_account_tables::{Customers, Staff};
    use super::m20240101_000002_create_catalog_tables::Products;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_cart_and_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Carts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Carts::Id).string_len(8).primary_key().not_null())
                        .col(ColumnDef::new(Carts::CustomerId).string_len(8).not_null().unique_key())
                        .col(ColumnDef::new(Carts::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Carts::UpdatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_carts_customer_id")
                                .from(Carts::Table, Carts::CustomerId)
                                .to(Customers::Table, Customers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CartDetails::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(CartDetails::Id).string_len(8).primary_key().not_null())
                        .col(ColumnDef::new(CartDetails::CartId).string_len(8).not_null())
                        .col(ColumnDef::new(CartDetails::ProductId).string_len(8).not_null())
                        .col(ColumnDef::new(CartDetails::Quantity).integer().not_null())
                        .col(ColumnDef::new(CartDetails::UnitPrice).decimal().not_null())
                        .col(ColumnDef::new(CartDetails::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(CartDetails::UpdatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_details_cart_id")
                                .from(CartDetails::Table, CartDetails::CartId)
                                .to(Carts::Table, Carts::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_details_product_id")
                                .from(CartDetails::Table, CartDetails::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_cart_details_cart_product")
                        .table(CartDetails::Table)
                        .col(CartDetails::CartId)
                        .col(CartDetails::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).string_len(8).primary_key().not_null())
                        .col(ColumnDef::new(Orders::CustomerId).string_len(8).not_null())
                        .col(ColumnDef::new(Orders::StaffId).string_len(8).null())
                        .col(ColumnDef::new(Orders::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Orders::PaymentMethod).string_len(20).not_null())
                        .col(ColumnDef::new(Orders::PaymentStatus).string_len(20).not_null())
                        .col(ColumnDef::new(Orders::Subtotal).decimal().not_null())
                        .col(
                            ColumnDef::new(Orders::DiscountTotal)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::ShippingFee)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::Total).decimal().not_null())
                        .col(ColumnDef::new(Orders::ShippingAddress).string().not_null())
                        .col(ColumnDef::new(Orders::Phone).string().not_null())
                        .col(ColumnDef::new(Orders::Note).string().null())
                        .col(ColumnDef::new(Orders::AppTransId).string().null())
                        .col(ColumnDef::new(Orders::ZpTransId).string().null())
                        .col(ColumnDef::new(Orders::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Orders::UpdatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_customer_id")
                                .from(Orders::Table, Orders::CustomerId)
                                .to(Customers::Table, Customers::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_staff_id")
                                .from(Orders::Table, Orders::StaffId)
                                .to(Staff::Table, Staff::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_customer_id")
                        .table(Orders::Table)
                        .col(Orders::CustomerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_app_trans_id")
                        .table(Orders::Table)
                        .col(Orders::AppTransId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderDetails::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(OrderDetails::Id).string_len(8).primary_key().not_null())
                        .col(ColumnDef::new(OrderDetails::OrderId).string_len(8).not_null())
                        .col(ColumnDef::new(OrderDetails::ProductId).string_len(8).not_null())
                        .col(ColumnDef::new(OrderDetails::ProductName).string().not_null())
                        .col(ColumnDef::new(OrderDetails::Quantity).integer().not_null())
                        .col(ColumnDef::new(OrderDetails::UnitPrice).decimal().not_null())
                        .col(ColumnDef::new(OrderDetails::LineTotal).decimal().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_details_order_id")
                                .from(OrderDetails::Table, OrderDetails::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_details_product_id")
                                .from(OrderDetails::Table, OrderDetails::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_details_order_id")
                        .table(OrderDetails::Table)
                        .col(OrderDetails::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderDetails::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CartDetails::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Carts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Carts {
        Table,
        Id,
        CustomerId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CartDetails {
        Table,
        Id,
        CartId,
        ProductId,
        Quantity,
        UnitPrice,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        CustomerId,
        StaffId,
        Status,
        PaymentMethod,
        PaymentStatus,
        Subtotal,
        DiscountTotal,
        ShippingFee,
        Total,
        ShippingAddress,
        Phone,
        Note,
        AppTransId,
        ZpTransId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderDetails {
        Table,
        Id,
        OrderId,
        ProductId,
        ProductName,
        Quantity,
        UnitPrice,
        LineTotal,
    }
}

mod m20240101_000004_create_notification_and_statistic_tables {
    use super::m20240101_000001_create_account_tables::Customers;
    use super::m20240101_000002_create_catalog_tables::Products;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_notification_and_statistic_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Notifications::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Notifications::Id).string_len(8).primary_key().not_null())
                        .col(ColumnDef::new(Notifications::Kind).string_len(20).not_null())
                        .col(ColumnDef::new(Notifications::Title).string().not_null())
                        .col(ColumnDef::new(Notifications::Message).text().not_null())
                        .col(ColumnDef::new(Notifications::ReferenceId).string_len(8).null())
                        .col(ColumnDef::new(Notifications::CreatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CustomerNotifications::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CustomerNotifications::Id)
                                .string_len(8)
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerNotifications::NotificationId)
                                .string_len(8)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerNotifications::CustomerId)
                                .string_len(8)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerNotifications::IsRead)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(CustomerNotifications::ReadAt).timestamp_with_time_zone().null())
                        .col(
                            ColumnDef::new(CustomerNotifications::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_customer_notifications_notification_id")
                                .from(CustomerNotifications::Table, CustomerNotifications::NotificationId)
                                .to(Notifications::Table, Notifications::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_customer_notifications_customer_id")
                                .from(CustomerNotifications::Table, CustomerNotifications::CustomerId)
                                .to(Customers::Table, Customers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_customer_notifications_customer_id")
                        .table(CustomerNotifications::Table)
                        .col(CustomerNotifications::CustomerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductStatistics::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ProductStatistics::Id).string_len(8).primary_key().not_null())
                        .col(
                            ColumnDef::new(ProductStatistics::ProductId)
                                .string_len(8)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(ProductStatistics::SoldQuantity)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductStatistics::Revenue)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(ProductStatistics::UpdatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_statistics_product_id")
                                .from(ProductStatistics::Table, ProductStatistics::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(RevenueStatistics::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(RevenueStatistics::Id).string_len(8).primary_key().not_null())
                        .col(ColumnDef::new(RevenueStatistics::Day).string_len(10).not_null().unique_key())
                        .col(
                            ColumnDef::new(RevenueStatistics::OrderCount)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(RevenueStatistics::Revenue)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(RevenueStatistics::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(RevenueStatistics::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductStatistics::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CustomerNotifications::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Notifications::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Notifications {
        Table,
        Id,
        Kind,
        Title,
        Message,
        ReferenceId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum CustomerNotifications {
        Table,
        Id,
        NotificationId,
        CustomerId,
        IsRead,
        ReadAt,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductStatistics {
        Table,
        Id,
        ProductId,
        SoldQuantity,
        Revenue,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum RevenueStatistics {
        Table,
        Id,
        Day,
        OrderCount,
        Revenue,
        UpdatedAt,
    }
}

mod m20240101_000005_seed_default_store {
    use crate::entities::{store, store_setting};
    use sea_orm::{ActiveModelTrait, EntityTrait, Set};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_seed_default_store"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let db = manager.get_connection();

            if store::Entity::find().one(db).await?.is_some() {
                return Ok(());
            }

            let store = store::ActiveModel {
                name: Set("Storefront".to_string()),
                address: Set(None),
                phone: Set(None),
                email: Set(None),
                ..Default::default()
            }
            .insert(db)
            .await?;

            store_setting::ActiveModel {
                store_id: Set(store.id),
                shipping_fee: Set(super::DEFAULT_SHIPPING_FEE),
                free_shipping_threshold: Set(super::DEFAULT_FREE_SHIPPING_THRESHOLD),
                currency: Set("VND".to_string()),
                is_open: Set(true),
                ..Default::default()
            }
            .insert(db)
            .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let db = manager.get_connection();
            store_setting::Entity::delete_many().exec(db).await?;
            store::Entity::delete_many().exec(db).await?;
            Ok(())
        }
    }
}
