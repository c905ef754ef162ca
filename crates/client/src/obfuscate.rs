//! Reversible obfuscation for the refresh token at rest.
//!
//! Byte-wise XOR against a fixed repeating key, then base64 so the result is
//! text-safe for the key-value store. This is obfuscation, not cryptographic
//! confidentiality: the key is a compile-time constant, so anyone with the
//! binary can reverse it. It only keeps the token from sitting in storage as
//! recognizable plaintext. If the refresh token ever needs real protection at
//! rest, use the platform keychain instead of strengthening this.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Fixed obfuscation key. Deliberately not a secret (see module docs).
const OBFUSCATION_KEY: &[u8] = b"prepbox-local-token-key";

/// Symmetric XOR + base64 codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCodec;

impl TokenCodec {
    /// Create a codec instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Obfuscate a plaintext token into a text-safe string.
    #[must_use]
    pub fn encode(&self, plaintext: &str) -> String {
        if plaintext.is_empty() {
            return String::new();
        }
        BASE64.encode(xor_with_key(plaintext.as_bytes()))
    }

    /// Reverse [`encode`](Self::encode).
    ///
    /// Returns `None` if the input is not valid base64 or the unmasked bytes
    /// are not UTF-8 (a corrupted or foreign entry in storage).
    #[must_use]
    pub fn decode(&self, encoded: &str) -> Option<String> {
        if encoded.is_empty() {
            return Some(String::new());
        }
        let masked = BASE64.decode(encoded).ok()?;
        String::from_utf8(xor_with_key(&masked)).ok()
    }
}

/// XOR is its own inverse, so the same transform both masks and unmasks.
fn xor_with_key(input: &[u8]) -> Vec<u8> {
    input
        .iter()
        .zip(OBFUSCATION_KEY.iter().cycle())
        .map(|(byte, key)| byte ^ key)
        .collect()
}
