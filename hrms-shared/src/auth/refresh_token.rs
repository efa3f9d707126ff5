/// Opaque refresh tokens
///
/// Refresh tokens are random strings handed to the client once. Only their
/// SHA-256 hash is persisted (see `models::refresh_token`), so a database
/// leak does not expose usable sessions.
///
/// Format: `rt_` followed by 48 base62 characters.
///
/// # Example
///
/// ```
/// use hrms_shared::auth::refresh_token::{generate_refresh_token, hash_refresh_token};
///
/// let (token, hash) = generate_refresh_token();
/// assert!(token.starts_with("rt_"));
/// assert_eq!(hash, hash_refresh_token(&token));
/// ```

use rand::Rng;
use sha2::{Digest, Sha256};

const TOKEN_PREFIX: &str = "rt_";
const TOKEN_RANDOM_LENGTH: usize = 48;

/// Total length of a refresh token
pub const REFRESH_TOKEN_LENGTH: usize = TOKEN_PREFIX.len() + TOKEN_RANDOM_LENGTH;

/// Generates a refresh token and its storage hash
pub fn generate_refresh_token() -> (String, String) {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    let random_part: String = (0..TOKEN_RANDOM_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();

    let token = format!("{}{}", TOKEN_PREFIX, random_part);
    let hash = hash_refresh_token(&token);

    (token, hash)
}

/// Hex-encoded SHA-256 of a token (64 characters)
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cheap shape check before touching the database
pub fn validate_refresh_token_format(token: &str) -> bool {
    token.len() == REFRESH_TOKEN_LENGTH
        && token
            .strip_prefix(TOKEN_PREFIX)
            .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_alphanumeric()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_refresh_token() {
        let (token, hash) = generate_refresh_token();

        assert_eq!(token.len(), REFRESH_TOKEN_LENGTH);
        assert!(validate_refresh_token_format(&token));
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_refresh_token(&token));
    }

    #[test]
    fn test_tokens_are_unique() {
        let (a, _) = generate_refresh_token();
        let (b, _) = generate_refresh_token();
        assert_ne!(a, b);
    }

    #[test]
    fn test_validate_refresh_token_format() {
        assert!(!validate_refresh_token_format(""));
        assert!(!validate_refresh_token_format("rt_short"));
        assert!(!validate_refresh_token_format(&format!("xx_{}", "a".repeat(48))));
        assert!(!validate_refresh_token_format(&format!("rt_{}!", "a".repeat(47))));
        assert!(validate_refresh_token_format(&format!("rt_{}", "a".repeat(48))));
    }
}
