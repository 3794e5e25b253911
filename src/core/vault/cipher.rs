//! Authenticated encryption of the bundle.
//!
//! Token layout, URL-safe base64 encoded:
//!
//! ```text
//! version (1) || nonce (12) || AES-256-GCM ciphertext + tag
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use rand::RngCore;
use tracing::trace;
use zeroize::Zeroizing;

use super::key::Key;
use crate::core::constants::NONCE_LEN;
use crate::error::{CryptoError, Result};

const VERSION: u8 = 0x01;

/// Encrypt `plaintext` into a text token.
pub fn seal(key: &Key, plaintext: &[u8]) -> Result<String> {
    trace!(plaintext_len = plaintext.len(), "sealing");

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::Encrypt(format!("AES-256-GCM encryption failed: {}", e)))?;

    let mut token = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
    token.push(VERSION);
    token.extend_from_slice(&nonce);
    token.extend_from_slice(&ciphertext);

    Ok(URL_SAFE.encode(token))
}

/// Decrypt a token produced by [`seal`].
///
/// # Errors
///
/// Returns `CryptoError::Decrypt` for malformed encoding, an unknown
/// version, a wrong key or any modification of the token.
pub fn open(key: &Key, token: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let text = std::str::from_utf8(token)
        .map_err(|_| CryptoError::Decrypt("token is not text".into()))?;
    let data = URL_SAFE
        .decode(text.trim_end_matches(['\n', '\r']))
        .map_err(|e| CryptoError::Decrypt(format!("invalid base64: {}", e)))?;

    let Some((&version, rest)) = data.split_first() else {
        return Err(CryptoError::Decrypt("empty token".into()).into());
    };
    if version != VERSION {
        return Err(CryptoError::Decrypt(format!("unsupported token version {}", version)).into());
    }
    if rest.len() < NONCE_LEN {
        return Err(CryptoError::Decrypt("token too short".into()).into());
    }

    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decrypt("wrong key or corrupted data".into()))?;

    trace!(plaintext_len = plaintext.len(), "opened");
    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let key = Key::generate();
        let token = seal(&key, b"{\"db\":{}}").unwrap();
        assert_eq!(open(&key, token.as_bytes()).unwrap().as_slice(), b"{\"db\":{}}");
    }

    #[test]
    fn test_nonce_varies() {
        let key = Key::generate();
        assert_ne!(seal(&key, b"same").unwrap(), seal(&key, b"same").unwrap());
    }

    #[test]
    fn test_wrong_key_fails() {
        let token = seal(&Key::generate(), b"secret").unwrap();
        let err = open(&Key::generate(), token.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("decryption failed"));
    }

    #[test]
    fn test_every_flipped_byte_is_detected() {
        let key = Key::generate();
        let token = seal(&key, b"{\"aws\":{\"k\":\"v\"}}").unwrap();

        for i in 0..token.len() {
            let mut tampered = token.clone().into_bytes();
            tampered[i] ^= 0x01;
            assert!(
                open(&key, &tampered).is_err(),
                "flip at byte {} went unnoticed",
                i
            );
        }
    }

    #[test]
    fn test_truncated_token_fails() {
        let key = Key::generate();
        let token = seal(&key, b"payload").unwrap();
        let data = URL_SAFE.decode(&token).unwrap();
        let short = URL_SAFE.encode(&data[..data.len() - 1]);
        assert!(open(&key, short.as_bytes()).is_err());
        assert!(open(&key, b"").is_err());
    }
}
