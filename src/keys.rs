//! License key codec and verifier.
//!
//! A key embeds a random nonce and a keyed signature over
//! `(email, machine_code, nonce)`. Verification recomputes the signature from
//! the claimed identity and compares in constant time; the plaintext
//! derivation inputs are never stored separately from the issued key.
//!
//! Wire format: `nonce_hex (16) || hmac_sha256_hex[..24]`, uppercased and
//! grouped in 4-char blocks: `XXXX-XXXX-XXXX-XXXX-XXXX-XXXX-XXXX-XXXX-XXXX-XXXX`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Nonce length in hex characters (8 random bytes).
const NONCE_HEX_LEN: usize = 16;

/// Truncated signature length in hex characters (96 bits).
const SIG_HEX_LEN: usize = 24;

/// Minimum decoded key length; anything shorter is malformed.
const MIN_KEY_HEX_LEN: usize = 40;

/// Server-held HMAC secret for key derivation. Never transmitted.
#[derive(Clone)]
pub struct KeySecret {
    secret: Vec<u8>,
}

impl KeySecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Load the secret from the `LICENSE_SECRET` env var, falling back to a
    /// fixed dev secret outside production.
    pub fn from_env(dev_mode: bool) -> Result<Self> {
        match std::env::var("LICENSE_SECRET") {
            Ok(s) if !s.trim().is_empty() => Ok(Self::new(s.trim().as_bytes().to_vec())),
            _ if dev_mode => Ok(Self::new(&b"development-secret"[..])),
            _ => Err(AppError::Internal(
                "LICENSE_SECRET must be set outside dev mode".into(),
            )),
        }
    }

    fn bytes(&self) -> &[u8] {
        &self.secret
    }
}

/// Compute the truncated hex signature over `(email, machine_code, nonce)`.
fn sign(secret: &KeySecret, email: &str, machine_code: &str, nonce_hex: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.bytes())
        .expect("HMAC can take key of any size");
    mac.update(email.as_bytes());
    mac.update(b":");
    mac.update(machine_code.as_bytes());
    mac.update(b":");
    mac.update(nonce_hex.as_bytes());
    let digest = hex::encode(mac.finalize().into_bytes());
    digest[..SIG_HEX_LEN].to_string()
}

/// Generate a license key for `(email, machine_code)`.
///
/// The random nonce forces two calls with identical inputs to produce
/// different keys.
pub fn generate_key(secret: &KeySecret, email: &str, machine_code: &str) -> String {
    use rand::rngs::OsRng;
    use rand::RngCore;

    let mut nonce = [0u8; 8];
    OsRng.fill_bytes(&mut nonce);
    let nonce_hex = hex::encode(nonce);

    let signature = sign(secret, email, machine_code, &nonce_hex);
    let raw = format!("{}{}", nonce_hex, signature).to_uppercase();

    raw.as_bytes()
        .chunks(4)
        .map(|chunk| std::str::from_utf8(chunk).expect("hex is ascii"))
        .collect::<Vec<_>>()
        .join("-")
}

/// A presented key split into its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedKey {
    /// Recovered nonce, lowercase hex.
    pub nonce: String,
    /// Claimed signature, lowercase hex.
    pub signature: String,
}

/// Strip separators, lowercase, and split a presented key.
///
/// Returns None for keys shorter than the minimum length or containing
/// anything but hex digits; no cryptographic work happens on malformed input.
pub fn decode_key(key: &str) -> Option<DecodedKey> {
    let raw: String = key
        .chars()
        .filter(|c| *c != '-')
        .collect::<String>()
        .to_lowercase();

    // Hex only: keeps the component slices below on char boundaries.
    if raw.len() < MIN_KEY_HEX_LEN || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    Some(DecodedKey {
        nonce: raw[..NONCE_HEX_LEN].to_string(),
        signature: raw[NONCE_HEX_LEN..].to_string(),
    })
}

/// Rejection reasons from [`verify_key`]. The strings are part of the
/// external contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyError {
    MissingField,
    InvalidKeyLength,
    SignatureMismatch,
}

impl VerifyError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingField => "missing field",
            Self::InvalidKeyLength => "invalid key length",
            Self::SignatureMismatch => "signature mismatch",
        }
    }
}

/// Outcome of verifying a presented key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub valid: bool,
    /// Recovered nonce when the key decoded, regardless of validity.
    pub nonce: Option<String>,
    pub reason: Option<VerifyError>,
}

impl Verification {
    fn reject(reason: VerifyError, nonce: Option<String>) -> Self {
        Self {
            valid: false,
            nonce,
            reason: Some(reason),
        }
    }
}

/// Decide whether `key` is authentic for the claimed `(email, machine_code)`.
///
/// Pure: no side effects, never touches storage. The signature comparison is
/// constant-time; mismatched lengths are unequal without leaking which byte
/// differed.
pub fn verify_key(secret: &KeySecret, key: &str, email: &str, machine_code: &str) -> Verification {
    if key.is_empty() || email.is_empty() || machine_code.is_empty() {
        return Verification::reject(VerifyError::MissingField, None);
    }

    let Some(decoded) = decode_key(key) else {
        return Verification::reject(VerifyError::InvalidKeyLength, None);
    };

    let expected = sign(secret, email, machine_code, &decoded.nonce);

    // Compare raw signature bytes, not hex strings, so a hex-decode failure
    // on garbage input is just a mismatch.
    let claimed_bytes = hex::decode(&decoded.signature).unwrap_or_default();
    let expected_bytes = hex::decode(&expected).expect("signature is valid hex");

    // ct_eq on slices treats differing lengths as unequal in constant time.
    let equal: bool = expected_bytes.ct_eq(&claimed_bytes).into();

    if equal {
        Verification {
            valid: true,
            nonce: Some(decoded.nonce),
            reason: None,
        }
    } else {
        Verification::reject(VerifyError::SignatureMismatch, Some(decoded.nonce))
    }
}
