//! Request validation helpers.
//!
//! All inputs that end up in a store key or an upstream request are checked
//! here before a handler touches the ledger.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use ghost_models::TEST_WALLET_ADDRESS;

/// Maximum accepted profile URL length.
pub const MAX_URL_LENGTH: usize = 512;

/// Maximum accepted record id length.
const MAX_RECORD_ID_LENGTH: usize = 64;

/// Ethereum-style address: `0x` followed by 40 hex digits.
static WALLET_ADDRESS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").unwrap());

/// Public LinkedIn profile URL.
static LINKEDIN_PROFILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://(www\.)?linkedin\.com/in/[A-Za-z0-9_%-]+/?$").unwrap());

/// Check a wallet address. The designated test address is accepted as-is.
pub fn is_valid_wallet(address: &str) -> bool {
    address == TEST_WALLET_ADDRESS || WALLET_ADDRESS.is_match(address)
}

/// Validate a LinkedIn profile URL, returning the trimmed form.
pub fn validate_linkedin_url(input: &str) -> Result<String, String> {
    let url = input.trim();
    if url.is_empty() {
        return Err("LinkedIn URL is required".to_string());
    }
    if url.len() > MAX_URL_LENGTH {
        return Err(format!("URL exceeds maximum length of {} characters", MAX_URL_LENGTH));
    }
    if Url::parse(url).is_err() || !LINKEDIN_PROFILE.is_match(url) {
        return Err("Invalid LinkedIn profile URL".to_string());
    }
    Ok(url.to_string())
}

/// Validate a search record id.
///
/// Ids are generated server-side as UUIDs; anything outside
/// `[A-Za-z0-9-]` would not be a valid document id either.
pub fn is_valid_record_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_RECORD_ID_LENGTH
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_validation() {
        assert!(is_valid_wallet("0x52908400098527886E0F7030069857D2E4169EE7"));
        assert!(is_valid_wallet("0xTESTWALLET"));
        assert!(!is_valid_wallet("0x1234"));
        assert!(!is_valid_wallet("52908400098527886E0F7030069857D2E4169EE7"));
        assert!(!is_valid_wallet("0xZZ908400098527886E0F7030069857D2E4169EE7"));
    }

    #[test]
    fn test_valid_linkedin_urls() {
        assert_eq!(
            validate_linkedin_url(" https://www.linkedin.com/in/jane-doe/ ").unwrap(),
            "https://www.linkedin.com/in/jane-doe/"
        );
        assert!(validate_linkedin_url("http://linkedin.com/in/jane_doe%20x").is_ok());
        assert!(validate_linkedin_url("https://LinkedIn.com/in/JaneDoe").is_ok());
    }

    #[test]
    fn test_invalid_linkedin_urls() {
        assert!(validate_linkedin_url("").is_err());
        assert!(validate_linkedin_url("https://linkedin.com/company/acme").is_err());
        assert!(validate_linkedin_url("https://evil.com/in/jane").is_err());
        assert!(validate_linkedin_url("https://linkedin.com/in/jane/posts").is_err());
        assert!(validate_linkedin_url("linkedin.com/in/jane").is_err());
    }

    #[test]
    fn test_record_id_validation() {
        assert!(is_valid_record_id("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_valid_record_id(""));
        assert!(!is_valid_record_id("../wallets/x"));
        assert!(!is_valid_record_id(&"a".repeat(65)));
    }
}
