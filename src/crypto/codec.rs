//! Asymmetric encrypt/decrypt of small UTF-8 messages.
//!
//! Wire format: `0x` + lowercase hex of one RSA-OAEP block (SHA-1 digest and
//! MGF1), the node-rsa `pkcs1_oaep` default.

use rsa::Oaep;
use sha1::Sha1;

use crate::crypto::keys::{SessionPrivateKey, SessionPublicKey};
use crate::crypto::{CryptoError, CryptoResult};

/// Marker prepended to hex data on chain.
pub const HEX_PREFIX: &str = "0x";

/// Encrypt `plaintext` for `public_key`, returning `0x`-prefixed hex.
pub fn encrypt(plaintext: &str, public_key: &SessionPublicKey) -> CryptoResult<String> {
    let ciphertext = encrypt_bytes(plaintext.as_bytes(), public_key)?;
    Ok(format!("{}{}", HEX_PREFIX, hex::encode(ciphertext)))
}

/// Encrypt raw bytes for `public_key`.
pub fn encrypt_bytes(plaintext: &[u8], public_key: &SessionPublicKey) -> CryptoResult<Vec<u8>> {
    let capacity = public_key.max_plaintext_len();
    if plaintext.len() > capacity {
        return Err(CryptoError::Encryption(format!(
            "plaintext of {} bytes exceeds key capacity of {} bytes",
            plaintext.len(),
            capacity
        )));
    }

    let mut rng = rand::thread_rng();
    public_key
        .inner()
        .encrypt(&mut rng, Oaep::new::<Sha1>(), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))
}

/// Inverse of [`encrypt`]: strip the prefix, decode hex, decrypt, decode UTF-8.
pub fn decrypt(encrypted_hex: &str, private_key: &SessionPrivateKey) -> CryptoResult<String> {
    let digits = encrypted_hex
        .strip_prefix(HEX_PREFIX)
        .or_else(|| encrypted_hex.strip_prefix("0X"))
        .unwrap_or(encrypted_hex);
    let ciphertext =
        hex::decode(digits).map_err(|e| CryptoError::Decryption(format!("invalid hex: {}", e)))?;

    let plaintext = decrypt_bytes(&ciphertext, private_key)?;
    String::from_utf8(plaintext)
        .map_err(|e| CryptoError::Decryption(format!("plaintext is not UTF-8: {}", e)))
}

/// Decrypt raw ciphertext bytes.
pub fn decrypt_bytes(ciphertext: &[u8], private_key: &SessionPrivateKey) -> CryptoResult<Vec<u8>> {
    private_key
        .inner()
        .decrypt(Oaep::new::<Sha1>(), ciphertext)
        .map_err(|e| CryptoError::Decryption(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SessionKeyPair;

    fn pair() -> SessionKeyPair {
        SessionKeyPair::generate_with_bits(1024).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let keys = pair();
        let envelope = r#"{"url":"https://abc123.ngrok.io"}"#;

        let encrypted = encrypt(envelope, keys.public_key()).unwrap();
        assert!(encrypted.starts_with("0x"));
        assert!(encrypted[2..].chars().all(|c| c.is_ascii_hexdigit()));

        let decrypted = decrypt(&encrypted, keys.private_key()).unwrap();
        assert_eq!(decrypted, envelope);
    }

    #[test]
    fn test_encryption_is_randomised() {
        let keys = pair();
        let a = encrypt("same", keys.public_key()).unwrap();
        let b = encrypt("same", keys.public_key()).unwrap();
        assert_ne!(a, b);
        assert_eq!(decrypt(&a, keys.private_key()).unwrap(), "same");
        assert_eq!(decrypt(&b, keys.private_key()).unwrap(), "same");
    }

    #[test]
    fn test_cross_key_rejection() {
        let a = pair();
        let b = pair();
        let encrypted = encrypt(r#"{"url":"https://a.example"}"#, a.public_key()).unwrap();

        let result = decrypt(&encrypted, b.private_key());
        assert!(matches!(result, Err(CryptoError::Decryption(_))));
    }

    #[test]
    fn test_plaintext_over_capacity() {
        let keys = pair();
        let too_long = "x".repeat(keys.public_key().max_plaintext_len() + 1);
        let result = encrypt(&too_long, keys.public_key());
        assert!(matches!(result, Err(CryptoError::Encryption(_))));
    }

    #[test]
    fn test_malformed_hex() {
        let keys = pair();
        assert!(matches!(
            decrypt("0xzz", keys.private_key()),
            Err(CryptoError::Decryption(_))
        ));
        assert!(matches!(
            decrypt("0xdeadbeef", keys.private_key()),
            Err(CryptoError::Decryption(_))
        ));
    }

    #[test]
    fn test_corrupted_ciphertext() {
        let keys = pair();
        let mut bytes = encrypt_bytes(b"payload", keys.public_key()).unwrap();
        bytes[10] ^= 0xff;
        assert!(decrypt_bytes(&bytes, keys.private_key()).is_err());
    }

    #[test]
    fn test_prefix_is_optional_on_decrypt() {
        let keys = pair();
        let encrypted = encrypt("bare", keys.public_key()).unwrap();
        assert_eq!(decrypt(&encrypted[2..], keys.private_key()).unwrap(), "bare");
    }
}
