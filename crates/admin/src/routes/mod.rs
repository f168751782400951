//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health, /health/ready           - Liveness and backend readiness
//!
//! # Accounts
//! POST /api/auth/signup | login | logout
//! GET  /api/auth/me
//! GET  /api/preferences                  - Theme
//! POST /api/preferences/theme
//!
//! # Stores (dashboard routes below act on the session's active store)
//! GET  /api/stores                       - Owned and member stores
//! POST /api/stores                       - Open a store
//! POST /api/stores/{id}/activate
//!
//! # Dashboard
//! GET|PUT /api/settings
//! PUT  /api/settings/shipping-companies
//! GET|POST /api/products, PUT /api/products/{id}
//! GET|POST /api/orders, GET /api/orders/{id}
//! POST /api/orders/{id}/status | calls
//! GET  /api/confirmation-queue
//! GET  /api/reports/collections
//! POST /api/fees/preview
//! GET  /api/wallet
//! POST /api/wallet/deposits | withdrawals | expenses | reconcile
//! DELETE /api/wallet/expenses/{id}
//! GET  /api/customers, /api/customers/{phone}
//! PUT  /api/customers/{phone}/note
//! GET|POST /api/employees, PUT|DELETE /api/employees/{id}
//! POST /api/invitations/{store_id}/accept
//! GET  /api/autosave, POST /api/autosave/save
//!
//! # Platform admins
//! GET  /api/admin/users
//! POST /api/admin/users/{phone}/ban | unban
//!
//! # Storefront (public)
//! GET  /store/{slug}
//! GET|POST|DELETE /store/{slug}/cart
//! POST /store/{slug}/checkout
//! ```

use axum::Router;

use crate::state::AppState;

pub mod admin_users;
pub mod auth;
pub mod autosave;
pub mod customers;
pub mod employees;
pub mod health;
pub mod orders;
pub mod preferences;
pub mod products;
pub mod settings;
pub mod storefront;
pub mod stores;
pub mod wallet;

/// Build the router with every route.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        // Accounts
        .merge(auth::router())
        .merge(preferences::router())
        .merge(stores::router())
        // Dashboard
        .merge(settings::router())
        .merge(products::router())
        .merge(orders::router())
        .merge(wallet::router())
        .merge(customers::router())
        .merge(employees::router())
        .merge(autosave::router())
        // Platform admins
        .merge(admin_users::router())
        // Public storefront
        .merge(storefront::router())
}
