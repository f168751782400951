//! Server-side models: session contents and API views.

pub mod session;
pub mod user;

pub use session::{Theme, keys as session_keys};
pub use user::UserView;
