pub mod auth;
pub mod collections;
pub mod orders;
pub mod products;
