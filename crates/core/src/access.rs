//! Who may do what in a store.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{StoreSettings, User};
use crate::types::{EmployeeStatus, Permission, StoreId};

/// How a user is related to a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    PlatformAdmin,
    Owner,
    Employee,
}

/// A user's resolved access to one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Access {
    pub role: Role,
    pub permissions: BTreeSet<Permission>,
}

impl Access {
    #[must_use]
    pub fn allows(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    #[must_use]
    pub const fn is_owner(&self) -> bool {
        matches!(self.role, Role::Owner | Role::PlatformAdmin)
    }
}

/// Resolve `user`'s access to `store`.
///
/// Platform admins and owners get every permission, active employees get
/// their grant, and banned users or invited-only members get nothing.
#[must_use]
pub fn resolve(user: &User, store: &StoreId, settings: &StoreSettings) -> Option<Access> {
    if user.is_banned {
        return None;
    }
    let everything = || Permission::ALL.into_iter().collect();
    if user.owns(store) {
        return Some(Access {
            role: Role::Owner,
            permissions: everything(),
        });
    }
    if user.is_admin {
        return Some(Access {
            role: Role::PlatformAdmin,
            permissions: everything(),
        });
    }
    settings
        .membership(&user.phone)
        .filter(|e| e.status == EmployeeStatus::Active)
        .map(|e| Access {
            role: Role::Employee,
            permissions: e.permissions.clone(),
        })
}
