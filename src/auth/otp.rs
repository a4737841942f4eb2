//! Time-based one-time passwords (RFC 6238, SHA-1, 6 digits, 30 s step).

use anyhow::{anyhow, Result};
use std::time::{SystemTime, UNIX_EPOCH};
use totp_rs::{Algorithm, Secret, TOTP};

const OTP_DIGITS: usize = 6;
const OTP_STEP: u64 = 30;
const OTP_ISSUER: &str = "roster";

/// Steps accepted either side of the current one. Widening the window
/// trades security for tolerance of client clock drift.
pub const DEFAULT_WINDOW: u8 = 1;

/// Generates a fresh base32-encoded seed for a new user.
///
/// Seeds are unique per user, created once at registration, and never
/// reused or rotated through this path.
///
/// # Errors
/// Returns an error if secret generation fails.
pub fn generate_seed() -> Result<String> {
    let secret = Secret::generate_secret();
    let bytes = secret
        .to_bytes()
        .map_err(|e| anyhow!("Secret gen error: {e}"))?;
    let totp = TOTP::new(
        Algorithm::SHA1,
        OTP_DIGITS,
        0,
        OTP_STEP,
        bytes,
        Some(OTP_ISSUER.to_string()),
        "user".to_string(), // label doesn't matter for seed issuance
    )
    .map_err(|e| anyhow!("TOTP init error: {e}"))?;
    Ok(totp.get_secret_base32())
}

fn totp_for(seed: &str, window: u8) -> Option<TOTP> {
    let bytes = Secret::Encoded(seed.to_string()).to_bytes().ok()?;
    TOTP::new(
        Algorithm::SHA1,
        OTP_DIGITS,
        window,
        OTP_STEP,
        bytes,
        Some(OTP_ISSUER.to_string()),
        "user".to_string(),
    )
    .ok()
}

/// The code a well-behaved client would present at `time` (seconds since
/// the Unix epoch). Returns `None` for malformed seeds.
#[must_use]
pub fn code_at(seed: &str, time: u64) -> Option<String> {
    totp_for(seed, 0).map(|totp| totp.generate(time))
}

/// Verifies `candidate` against `seed` at `time`, accepting `window`
/// steps of drift either side.
///
/// Malformed seeds or codes verify false; this function never fails.
#[must_use]
pub fn verify(seed: &str, candidate: &str, time: u64, window: u8) -> bool {
    totp_for(seed, window).map_or(false, |totp| totp.check(candidate, time))
}

/// Verifies `candidate` against the current wall clock.
#[must_use]
pub fn verify_now(seed: &str, candidate: &str, window: u8) -> bool {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .map_or(false, |now| verify(seed, candidate, now, window))
}
