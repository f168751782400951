//! Persisted documents and the operations on them.
//!
//! - [`GlobalData`] holds users, their stores and loyalty balances.
//! - [`StoreData`] holds one store's orders, settings, wallet and cart.

pub mod order;
pub mod settings;
pub mod store_data;
pub mod user;
pub mod wallet;

pub use order::{CallLogEntry, NewOrder, Order, OrderItem, StatusChange};
pub use settings::{Employee, LoyaltySettings, Product, ShippingCompany, StoreSettings};
pub use store_data::{
    CartLine, CheckoutDetails, OrderFilter, QueueEntry, StoreData, TransitionOutcome,
};
pub use user::{GlobalData, LoyaltyData, Store, User, slugify};
pub use wallet::{CategoryTotals, Posting, Reconciliation, Transaction, Wallet, WalletSummary};
