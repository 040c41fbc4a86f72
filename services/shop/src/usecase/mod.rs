pub mod account;
pub mod catalog;
pub mod oauth;
pub mod order;
pub mod password;
pub mod payment;
pub mod token;
