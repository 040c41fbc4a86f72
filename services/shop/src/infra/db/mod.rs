//! sea-orm implementations of the repository traits.

mod catalog;
mod orders;
mod payments;
mod users;

use sea_orm::{DbErr, SqlErr, TransactionError};

use crate::error::ShopError;

pub use catalog::DbProductRepository;
pub use orders::DbOrderRepository;
pub use payments::DbPaymentRepository;
pub use users::DbUserRepository;

/// Message of a unique-constraint violation, if `err` is one.
fn unique_violation(err: &DbErr) -> Option<String> {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => Some(message),
        _ => None,
    }
}

fn foreign_key_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
}

/// Unwrap a transaction error: domain errors raised inside the closure pass
/// through, connection failures become `Internal`.
fn tx_error(err: TransactionError<ShopError>, what: &'static str) -> ShopError {
    match err {
        TransactionError::Connection(e) => ShopError::Internal(anyhow::Error::new(e).context(what)),
        TransactionError::Transaction(e) => e,
    }
}
