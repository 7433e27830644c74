//! Time-based one-time passwords (RFC 6238) on top of HOTP (RFC 4226).
//!
//! Parameters are fixed to what authenticator apps assume by default:
//! HMAC-SHA1, 6 digits, 30 second step.

use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

pub const DIGITS: u32 = 6;
pub const STEP_SECONDS: u64 = 30;

/// Steps of clock drift tolerated on either side of the current one.
pub const SKEW_STEPS: u64 = 1;

pub const ISSUER: &str = "shopdesk";

const SECRET_LEN: usize = 20;

/// Fresh 160-bit secret, base32 without padding.
pub fn generate_secret() -> String {
    let bytes: [u8; SECRET_LEN] = rand::random();
    BASE32_NOPAD.encode(&bytes)
}

/// `otpauth://` URI for QR enrollment.
pub fn provisioning_uri(secret: &str, account: &str) -> String {
    let label = format!("{}:{}", ISSUER, account);
    format!(
        "otpauth://totp/{}?secret={}&issuer={}&algorithm=SHA1&digits={}&period={}",
        urlencode(&label),
        urlencode(secret),
        urlencode(ISSUER),
        DIGITS,
        STEP_SECONDS
    )
}

fn urlencode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn decode_secret(secret: &str) -> Option<Vec<u8>> {
    let normalized: String = secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    BASE32_NOPAD.decode(normalized.as_bytes()).ok()
}

/// HOTP value for `counter`, as a number below `10^DIGITS`.
fn hotp(key: &[u8], counter: u64) -> Option<u32> {
    let mut mac = HmacSha1::new_from_slice(key).ok()?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);
    Some(binary % 10u32.pow(DIGITS))
}

/// The zero-padded code for `secret` at `unix_time`.
pub fn code_at(secret: &str, unix_time: u64) -> Option<String> {
    let key = decode_secret(secret)?;
    let value = hotp(&key, unix_time / STEP_SECONDS)?;
    Some(format!("{:0width$}", value, width = DIGITS as usize))
}

/// Check `code` against `secret` at `unix_time`, allowing ±[`SKEW_STEPS`].
pub fn verify(secret: &str, code: &str, unix_time: u64) -> bool {
    let code = code.trim();
    if code.len() != DIGITS as usize || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let Some(key) = decode_secret(secret) else {
        return false;
    };
    let current = unix_time / STEP_SECONDS;
    let first = current.saturating_sub(SKEW_STEPS);
    (first..=current + SKEW_STEPS).any(|counter| {
        hotp(&key, counter)
            .map(|value| format!("{:0width$}", value, width = DIGITS as usize))
            .is_some_and(|expected| {
                super::crypto::constant_time_eq(expected.as_bytes(), code.as_bytes())
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ASCII "12345678901234567890", the RFC 6238 SHA-1 test key.
    fn rfc_secret() -> String {
        BASE32_NOPAD.encode(b"12345678901234567890")
    }

    #[test]
    fn rfc6238_sha1_vectors() {
        // Reference values are 8 digits; a 6 digit code is the low 6 of them.
        let cases = [
            (59, "287082"),
            (1_111_111_109, "081804"),
            (1_111_111_111, "050471"),
            (1_234_567_890, "005924"),
            (2_000_000_000, "279037"),
            (20_000_000_000, "353130"),
        ];
        for (time, expected) in cases {
            assert_eq!(code_at(&rfc_secret(), time).as_deref(), Some(expected), "t={}", time);
        }
    }

    #[test]
    fn accepts_one_step_of_drift_only() {
        let secret = rfc_secret();
        let now = 1_111_111_111;
        let previous = code_at(&secret, now - STEP_SECONDS).unwrap();
        let next = code_at(&secret, now + STEP_SECONDS).unwrap();
        let stale = code_at(&secret, now - 3 * STEP_SECONDS).unwrap();

        assert!(verify(&secret, &previous, now));
        assert!(verify(&secret, &next, now));
        assert!(!verify(&secret, &stale, now));
    }

    #[test]
    fn rejects_malformed_codes() {
        let secret = rfc_secret();
        assert!(!verify(&secret, "12345", 59));
        assert!(!verify(&secret, "28708a", 59));
        assert!(!verify("not base32 !!", "287082", 59));
    }

    #[test]
    fn generated_secrets_decode_to_160_bits() {
        let secret = generate_secret();
        assert_eq!(decode_secret(&secret).unwrap().len(), 20);
        assert!(!secret.contains('='));
    }

    #[test]
    fn provisioning_uri_names_issuer_and_secret() {
        let uri = provisioning_uri("JBSWY3DPEHPK3PXP", "ada@example.com");
        assert!(uri.starts_with("otpauth://totp/shopdesk%3Aada%40example.com?"));
        assert!(uri.contains("secret=JBSWY3DPEHPK3PXP"));
        assert!(uri.contains("issuer=shopdesk"));
    }
}
