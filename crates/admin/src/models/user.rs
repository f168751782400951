//! API views of users.

use chrono::{DateTime, Utc};
use serde::Serialize;

use souq_core::{Phone, Store, User};

/// A user as returned to clients: everything except the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub name: String,
    pub phone: Phone,
    pub email: Option<String>,
    pub is_admin: bool,
    pub is_banned: bool,
    pub stores: Vec<Store>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            phone: user.phone.clone(),
            email: user.email.as_ref().map(|e| e.as_str().to_owned()),
            is_admin: user.is_admin,
            is_banned: user.is_banned,
            stores: user.stores.clone(),
            created_at: user.created_at,
        }
    }
}
