//! Authentication endpoints and request guards.

pub mod login;
pub mod principal;
pub mod session;

pub use login::login;
pub use session::{logout, session};
