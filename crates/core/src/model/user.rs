//! Users, stores and the global data blob.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::types::{CurrencyCode, Email, Phone, StoreId};

/// A platform account. Identified by phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub name: String,
    pub phone: Phone,
    #[serde(default)]
    pub email: Option<Email>,
    /// Argon2 PHC string. Never serialized to API clients; see `UserView`
    /// in the admin crate.
    pub password_hash: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_banned: bool,
    /// Stores this user owns.
    #[serde(default)]
    pub stores: Vec<Store>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether this user owns the store.
    #[must_use]
    pub fn owns(&self, store_id: &StoreId) -> bool {
        self.stores.iter().any(|s| &s.id == store_id)
    }
}

/// A tenant: one merchant's shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub currency: CurrencyCode,
    /// Public slug of the storefront (`/store/{url}`).
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Loyalty point balances: store → customer phone → points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct LoyaltyData(BTreeMap<StoreId, BTreeMap<Phone, i64>>);

impl LoyaltyData {
    /// Point balances of one store's customers.
    #[must_use]
    pub fn for_store(&self, store_id: &StoreId) -> Option<&BTreeMap<Phone, i64>> {
        self.0.get(store_id)
    }

    #[must_use]
    pub fn points(&self, store_id: &StoreId, phone: &Phone) -> i64 {
        self.0
            .get(store_id)
            .and_then(|accounts| accounts.get(phone))
            .copied()
            .unwrap_or(0)
    }

    /// Add (or with a negative value, redeem) points. Returns the new balance.
    pub fn award(&mut self, store_id: &StoreId, phone: &Phone, points: i64) -> i64 {
        let balance = self
            .0
            .entry(store_id.clone())
            .or_default()
            .entry(phone.clone())
            .or_insert(0);
        *balance += points;
        *balance
    }
}

/// The global blob: every user plus loyalty balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GlobalData {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub loyalty_data: LoyaltyData,
}

impl GlobalData {
    #[must_use]
    pub fn user(&self, phone: &Phone) -> Option<&User> {
        self.users.iter().find(|u| &u.phone == phone)
    }

    pub fn user_mut(&mut self, phone: &Phone) -> Option<&mut User> {
        self.users.iter_mut().find(|u| &u.phone == phone)
    }

    /// Find a store and its owner by id.
    #[must_use]
    pub fn store(&self, store_id: &StoreId) -> Option<(&User, &Store)> {
        self.users.iter().find_map(|user| {
            user.stores
                .iter()
                .find(|s| &s.id == store_id)
                .map(|store| (user, store))
        })
    }

    /// Find a store by its public slug.
    #[must_use]
    pub fn store_by_slug(&self, slug: &str) -> Option<&Store> {
        self.users
            .iter()
            .flat_map(|u| u.stores.iter())
            .find(|s| s.url.eq_ignore_ascii_case(slug))
    }

    /// Open a new store for `owner` with a slug unique across all users.
    ///
    /// # Errors
    ///
    /// Returns an error if the owner does not exist or the name is blank.
    pub fn create_store(
        &mut self,
        owner: &Phone,
        name: &str,
        specialization: &str,
        currency: CurrencyCode,
        at: DateTime<Utc>,
    ) -> Result<Store, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::Invalid("store name is required".to_string()));
        }
        let id = StoreId::generate();
        let base = match slugify(name) {
            slug if slug.is_empty() => id.as_str().replace('_', "-"),
            slug => slug,
        };
        let mut url = base.clone();
        let mut n = 2;
        while self.store_by_slug(&url).is_some() {
            url = format!("{base}-{n}");
            n += 1;
        }

        let store = Store {
            id,
            name: name.to_owned(),
            specialization: specialization.trim().to_owned(),
            currency,
            url,
            created_at: at,
        };
        self.user_mut(owner)
            .ok_or_else(|| DomainError::UserNotFound(owner.to_string()))?
            .stores
            .push(store.clone());
        Ok(store)
    }
}

/// Turn a store name into a URL slug: lowercase ASCII alphanumerics
/// separated by single dashes. Non-ASCII names produce an empty slug and
/// the caller falls back to the store id.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_owned()
}
