//! AES-256-CBC envelopes: `base64(IV || ciphertext)` with key = SHA-256(secret).
//!
//! There is no MAC. A wrong key is only noticed when the padding happens not to check out,
//! so callers treat a failed open as "not encrypted" rather than as tampering.

use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use sha2::{Digest, Sha256};
use crate::codec;
use crate::error::CryptoError;

pub const IV_LEN: usize = 16;

type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;

fn derive_key(secret: &str) -> [u8; 32] { Sha256::digest(secret.as_bytes()).into() }

pub fn decrypt(envelope: &str, secret: &str) -> Result<Vec<u8>, CryptoError> {
    let bin = codec::decode_base64(envelope).map_err(|_| CryptoError::Envelope)?;
    if bin.len() <= IV_LEN { return Err(CryptoError::TooShort(bin.len())); }
    let (iv, ct) = bin.split_at(IV_LEN);
    let key = derive_key(secret);
    Aes256CbcDec::new_from_slices(&key, iv)
        .map_err(|_| CryptoError::KeyLength)?
        .decrypt_padded_vec_mut::<Pkcs7>(ct)
        .map_err(|_| CryptoError::Padding)
}

pub fn seal(plaintext: &[u8], secret: &str, iv: [u8; IV_LEN]) -> String {
    let key = derive_key(secret);
    let ct = Aes256CbcEnc::new(&key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    let mut out = Vec::with_capacity(IV_LEN + ct.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ct);
    codec::encode_base64(&out)
}

/// Seals `base64(payload)`, the layout item payloads are expected to carry.
pub fn seal_payload(payload: &[u8], secret: &str, iv: [u8; IV_LEN]) -> String {
    seal(codec::encode_base64(payload).as_bytes(), secret, iv)
}

pub fn random_iv() -> Result<[u8; IV_LEN], CryptoError> {
    let mut iv = [0u8; IV_LEN];
    getrandom::getrandom(&mut iv).map_err(|e| CryptoError::Rng(e.to_string()))?;
    Ok(iv)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IV: [u8; IV_LEN] = [7u8; IV_LEN];

    #[test]
    fn sealed_envelope_opens_with_same_secret() {
        let env = seal(b"eyJhIjoxfQ==", "segredo", IV);
        assert!(codec::is_plausible_base64(&env));
        assert_eq!(decrypt(&env, "segredo").unwrap(), b"eyJhIjoxfQ==");
    }

    #[test]
    fn envelope_starts_with_iv() {
        let env = seal(b"x", "k", IV);
        let bin = codec::decode_base64(&env).unwrap();
        assert_eq!(&bin[..IV_LEN], &IV);
        assert_eq!(bin.len(), IV_LEN + 16);
    }

    #[test]
    fn wrong_secret_never_yields_plaintext() {
        let env = seal(b"eyJhIjoxfQ==", "k", IV);
        assert_ne!(decrypt(&env, "wrong").ok().as_deref(), Some(&b"eyJhIjoxfQ=="[..]));
    }

    #[test]
    fn short_or_malformed_envelopes_fail() {
        assert_eq!(decrypt(&codec::encode_base64(&[1u8; IV_LEN]), "k"), Err(CryptoError::TooShort(IV_LEN)));
        assert_eq!(decrypt("not base64!", "k"), Err(CryptoError::Envelope));
        assert_eq!(decrypt(&codec::encode_base64(&[1u8; IV_LEN + 5]), "k"), Err(CryptoError::Padding));
    }

    #[test]
    fn random_ivs_differ() {
        assert_ne!(random_iv().unwrap(), random_iv().unwrap());
    }
}
