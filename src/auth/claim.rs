//! Identity claim carried by an authenticated session.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The identity asserted by a session once authenticated.
///
/// The claim never touches durable storage; it lives only inside the
/// encrypted session token and the in-memory request context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Claim {
    /// Administrative session, established with the configured access id.
    Admin { access_id: String },
    /// Regular user session, established with the user's own seed.
    User { user_id: Uuid, dom_name: String },
}

impl Claim {
    /// The external-facing name of the authenticated principal.
    #[must_use]
    pub fn subject(&self) -> &str {
        match self {
            Self::Admin { access_id } => access_id,
            Self::User { dom_name, .. } => dom_name,
        }
    }

    #[must_use]
    pub fn role(&self) -> &'static str {
        match self {
            Self::Admin { .. } => "admin",
            Self::User { .. } => "user",
        }
    }
}
