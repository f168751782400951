//! Session-stored state.
//!
//! Three values live in the session: who is logged in, which store the
//! dashboard acts on, and the UI theme.

use serde::{Deserialize, Serialize};

/// UI colour theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Session keys.
pub mod keys {
    /// Normalized phone of the logged-in user.
    pub const LOGGED_IN_USER_PHONE: &str = "logged_in_user_phone";

    /// Store the dashboard routes act on.
    pub const LAST_ACTIVE_STORE_ID: &str = "last_active_store_id";

    /// [`super::Theme`] preference.
    pub const THEME: &str = "theme";
}
