//! Auth configuration and process-wide auth state.

use secrecy::{ExposeSecret, SecretString};

use crate::auth::token;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    access_id: String,
    secret: SecretString,
    otp_window: u8,
    session_ttl_seconds: i64,
    cookie_secure: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(access_id: String, secret: SecretString) -> Self {
        Self {
            access_id,
            secret,
            otp_window: crate::auth::otp::DEFAULT_WINDOW,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            cookie_secure: true,
        }
    }

    #[must_use]
    pub fn with_otp_window(mut self, window: u8) -> Self {
        self.otp_window = window;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    /// The configured administrative login id.
    #[must_use]
    pub fn access_id(&self) -> &str {
        &self.access_id
    }

    /// The administrative secret, doubling as the admin TOTP seed.
    pub(crate) fn admin_seed(&self) -> &str {
        self.secret.expose_secret()
    }

    #[must_use]
    pub fn otp_window(&self) -> u8 {
        self.otp_window
    }

    pub(crate) fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(crate) fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }
}

/// Shared auth state: the configuration plus the cipher key derived from
/// the administrative secret. Carried as an axum `Extension`.
pub struct AuthState {
    config: AuthConfig,
    key: [u8; 32],
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let key = token::derive_key(config.secret.expose_secret());
        Self { config, key }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn key(&self) -> &[u8; 32] {
        &self.key
    }
}
