//! Domain rule violations.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{
    EmailError, EmployeeStatus, OrderStatus, PhoneError, ProductId, ShippingCompanyId,
    TransactionId,
};

/// Errors raised by domain operations on a store's data.
///
/// These describe a request the rules reject, never an I/O failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("store not found: {0}")]
    StoreNotFound(String),

    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("not enough stock for {product}: {available} left, {requested} requested")]
    OutOfStock {
        product: String,
        available: u32,
        requested: u32,
    },

    #[error("cart is empty")]
    EmptyCart,

    #[error("order has no items")]
    NoItems,

    #[error("shipping company not found: {0}")]
    ShippingCompanyNotFound(ShippingCompanyId),

    #[error("employee not found: {0}")]
    EmployeeNotFound(String),

    #[error("cannot move employee from {from:?} to {to:?}")]
    InvalidEmployeeTransition {
        from: EmployeeStatus,
        to: EmployeeStatus,
    },

    #[error("{0} is already a member of this store")]
    AlreadyMember(String),

    #[error("transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    #[error("transaction {0} is not an expense")]
    NotAnExpense(TransactionId),

    #[error("transaction {0} was already reversed")]
    AlreadyReversed(TransactionId),

    #[error("amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    #[error("invalid phone: {0}")]
    InvalidPhone(#[from] PhoneError),

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("{0}")]
    Invalid(String),
}
