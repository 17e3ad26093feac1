// Catalog
pub mod categories;
pub mod favorites;
pub mod products;
pub mod reviews;

// Shopping and orders
pub mod cart;
pub mod orders;
pub mod payments;
pub mod pricing;

// Store side
pub mod notifications;
pub mod promotions;
pub mod statistics;
pub mod store;
