//! # Roster (Account & Group Management)
//!
//! `roster` is a small multi-tenant account/group management backend. It
//! exposes CRUD endpoints for users and groups, gated by an administrative
//! credential and a time-based one-time-password (TOTP) second factor.
//!
//! ## Authentication
//!
//! There are two parallel login flows sharing one TOTP primitive:
//!
//! - **Administrative login:** the configured access id plus a code derived
//!   from the administrative secret.
//! - **User login:** a user's `dom_name` plus a code derived from the
//!   per-user seed generated at registration. Seeds are immutable once
//!   issued.
//!
//! A successful login encrypts an identity claim with `ChaCha20-Poly1305`
//! (keyed from the administrative secret) and sets it as an `HttpOnly`
//! session cookie. No plaintext identity is held server-side; logout simply
//! clears the cookie and is idempotent.
//!
//! ## Authorization & Membership
//!
//! Groups are owned collections of users. A membership links one user to
//! one group, optionally elevated to group admin. Access decisions are
//! evaluated fresh on every request:
//!
//! - **System admin** (the administrative claim) has unrestricted access.
//! - **Group admin** rights are scoped to a single group's membership row.
//! - **Members** may list their group's roster, nothing more.
//!
//! Failed or absent authentication short-circuits with `401 Unauthorized`
//! before any domain logic runs, and never reveals whether a resource
//! exists.

pub mod api;
pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
