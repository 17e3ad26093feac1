//! sea-orm entities for the storefront schema.
//!
//! Every table uses an 8-character alphanumeric string key assigned in
//! `ActiveModelBehavior::before_save` (see [`crate::ids`]).

pub mod admin;
pub mod cart;
pub mod cart_detail;
pub mod category;
pub mod customer;
pub mod customer_notification;
pub mod event;
pub mod notification;
pub mod order;
pub mod order_detail;
pub mod product;
pub mod product_favorite;
pub mod product_statistic;
pub mod review;
pub mod revenue_statistic;
pub mod staff;
pub mod store;
pub mod store_setting;

pub mod prelude {
    pub use super::admin::Entity as Admin;
    pub use super::cart::Entity as Cart;
    pub use super::cart_detail::Entity as CartDetail;
    pub use super::category::Entity as Category;
    pub use super::customer::Entity as Customer;
    pub use super::customer_notification::Entity as CustomerNotification;
    pub use super::event::Entity as Event;
    pub use super::notification::Entity as Notification;
    pub use super::order::Entity as Order;
    pub use super::order_detail::Entity as OrderDetail;
    pub use super::product::Entity as Product;
    pub use super::product_favorite::Entity as ProductFavorite;
    pub use super::product_statistic::Entity as ProductStatistic;
    pub use super::review::Entity as Review;
    pub use super::revenue_statistic::Entity as RevenueStatistic;
    pub use super::staff::Entity as Staff;
    pub use super::store::Entity as Store;
    pub use super::store_setting::Entity as StoreSetting;
}
