//! Local session-token inspection.
//!
//! The client reads the expiry claim straight out of the token payload,
//! without verifying the signature (it does not hold the secret) and without
//! a network round-trip. The server remains authoritative; this
//! classification only decides whether a refresh is worth attempting.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Time before expiry during which a proactive refresh is attempted: 30 minutes.
pub const PRE_EXPIRY_WINDOW_SECS: u64 = 30 * 60;

/// Time after expiry during which a reactive refresh may still succeed:
/// 30 minutes, mirroring the server's grace window.
pub const GRACE_WINDOW_SECS: u64 = 30 * 60;

/// Where a token sits relative to its expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// More than the pre-expiry window away from expiry.
    Fresh,
    /// Inside the pre-expiry window, not yet expired.
    NearingExpiry,
    /// Expired, but within the grace window.
    InGrace,
    /// Expired beyond the grace window.
    Dead,
}

/// Extract the `exp` claim from a JWT without verifying it.
/// Returns None for anything that does not parse as a JWT payload.
pub fn decode_expiry(token: &str) -> Option<u64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    value.get("exp")?.as_u64()
}

/// Classify a token by its expiry claim. Returns None when the expiry
/// cannot be decoded; callers attach such tokens as-is and let the server
/// decide.
pub fn classify_token(token: &str, now: u64) -> Option<TokenState> {
    let exp = decode_expiry(token)?;
    Some(classify(exp, now))
}

fn classify(exp: u64, now: u64) -> TokenState {
    if now >= exp {
        if now - exp <= GRACE_WINDOW_SECS {
            TokenState::InGrace
        } else {
            TokenState::Dead
        }
    } else if exp - now <= PRE_EXPIRY_WINDOW_SECS {
        TokenState::NearingExpiry
    } else {
        TokenState::Fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    #[test]
    fn test_classify_fresh() {
        // Expires in 10 hours
        assert_eq!(classify(NOW + 36_000, NOW), TokenState::Fresh);
        // Exactly one second past the pre-expiry window
        assert_eq!(
            classify(NOW + PRE_EXPIRY_WINDOW_SECS + 1, NOW),
            TokenState::Fresh
        );
    }

    #[test]
    fn test_classify_nearing_expiry() {
        // Expires in 10 minutes
        assert_eq!(classify(NOW + 600, NOW), TokenState::NearingExpiry);
        // Window boundary counts as nearing
        assert_eq!(
            classify(NOW + PRE_EXPIRY_WINDOW_SECS, NOW),
            TokenState::NearingExpiry
        );
        // One second left
        assert_eq!(classify(NOW + 1, NOW), TokenState::NearingExpiry);
    }

    #[test]
    fn test_classify_in_grace() {
        // Expired this very second
        assert_eq!(classify(NOW, NOW), TokenState::InGrace);
        // Expired 5 minutes ago
        assert_eq!(classify(NOW - 300, NOW), TokenState::InGrace);
        // Grace boundary
        assert_eq!(classify(NOW - GRACE_WINDOW_SECS, NOW), TokenState::InGrace);
    }

    #[test]
    fn test_classify_dead() {
        assert_eq!(
            classify(NOW - GRACE_WINDOW_SECS - 1, NOW),
            TokenState::Dead
        );
        // Expired two hours ago
        assert_eq!(classify(NOW - 7200, NOW), TokenState::Dead);
    }

    #[test]
    fn test_decode_expiry() {
        // Payload {"sub":"x","exp":1700000000} encoded by hand
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"x","exp":1700000000}"#);
        let token = format!("aGVhZGVy.{}.c2ln", payload);
        assert_eq!(decode_expiry(&token), Some(1_700_000_000));
    }

    #[test]
    fn test_decode_expiry_garbage() {
        assert_eq!(decode_expiry("garbage"), None);
        assert_eq!(decode_expiry("a.b.c"), None);
        assert_eq!(decode_expiry(""), None);

        // Valid base64, no exp claim
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"x"}"#);
        let token = format!("aGVhZGVy.{}.c2ln", payload);
        assert_eq!(decode_expiry(&token), None);
    }
}
