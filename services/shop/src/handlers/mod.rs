pub mod admin;
pub mod auth;
pub mod oauth;
pub mod order;
pub mod payment;
pub mod product;
pub mod user;
