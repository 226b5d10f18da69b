use anyhow::Result;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::time::Duration;
use tokio::time::Instant;

/// Hash a password using Argon2id, returning the PHC string to store
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(password_hash)
}

/// Verify a candidate against a stored PHC hash
///
/// Errors only when the stored value is not a parseable hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

    let argon2 = Argon2::default();

    Ok(argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
pub(crate) const SAMPLE_PASSWORD: &str = "Secret@12345";

/// Hash of `SAMPLE_PASSWORD`, computed once per test binary
#[cfg(test)]
pub(crate) fn sample_hash() -> &'static str {
    static HASH: std::sync::OnceLock<String> = std::sync::OnceLock::new();
    HASH.get_or_init(|| hash_password(SAMPLE_PASSWORD).unwrap())
}

/// Sliding-window limiter for password attempts
#[derive(Debug)]
pub struct RateLimiter {
    attempts: Vec<Instant>,
    max_attempts: usize,
    window_duration: Duration,
}

impl RateLimiter {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            attempts: Vec::new(),
            max_attempts,
            window_duration: window,
        }
    }

    /// Record an attempt if one is allowed right now
    pub fn is_allowed(&mut self) -> bool {
        let now = Instant::now();
        self.prune(now);

        if self.attempts.len() < self.max_attempts {
            self.attempts.push(now);
            true
        } else {
            false
        }
    }

    /// Get time until next attempt is allowed
    pub fn time_until_allowed(&self) -> Option<Duration> {
        if self.attempts.len() < self.max_attempts {
            return None;
        }

        let oldest = self.attempts.first()?;
        let elapsed = Instant::now().duration_since(*oldest);

        if elapsed < self.window_duration {
            Some(self.window_duration - elapsed)
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.attempts.clear();
    }

    fn prune(&mut self, now: Instant) {
        let window = self.window_duration;
        self.attempts
            .retain(|&attempt| now.duration_since(attempt) < window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("Secret@12345").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("Secret@12345"));
        assert!(verify_password("Secret@12345", &hash).unwrap());
        assert!(!verify_password("secret@12345", &hash).unwrap());
        assert!(!verify_password("Secret@1234", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("Secret@12345").unwrap();
        let second = hash_password("Secret@12345").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_plaintext_is_not_a_hash() {
        assert!(verify_password("Secret@12345", "Secret@12345").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_allows_attempts() {
        let mut limiter = RateLimiter::new(3, Duration::from_secs(60));

        assert!(limiter.is_allowed());
        assert!(limiter.is_allowed());
        assert!(limiter.is_allowed());
        assert!(!limiter.is_allowed()); // 4th attempt should fail
        assert_eq!(limiter.time_until_allowed(), Some(Duration::from_secs(60)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_reset() {
        let mut limiter = RateLimiter::new(2, Duration::from_secs(60));

        assert!(limiter.is_allowed());
        assert!(limiter.is_allowed());
        assert!(!limiter.is_allowed());

        limiter.reset();
        assert!(limiter.is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_window_expiry() {
        let mut limiter = RateLimiter::new(2, Duration::from_secs(1));

        assert!(limiter.is_allowed());
        assert!(limiter.is_allowed());
        assert!(!limiter.is_allowed());

        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(limiter.time_until_allowed().is_none());
        assert!(limiter.is_allowed());
    }
}
