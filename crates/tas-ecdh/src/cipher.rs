//! Session encryption: AES-128/256 in CBC or ECB mode.
//!
//! PKCS5 padding on 16-byte blocks is PKCS7. With `NOPAD` the plaintext
//! must already be block aligned. ECB ignores the IV, but an IV is still
//! generated and transmitted so every suite shares one wire shape.

use aes::{Aes128, Aes256};
use cbc::cipher::block_padding::{NoPadding, Pkcs7};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;

use tas_core::{SymmetricCipherType, SymmetricPaddingType};

use crate::crypto::SessionKey;
use crate::error::{EcdhError, Result};

/// AES block and IV length.
pub const BLOCK_LEN: usize = 16;

/// Generate a random 16-byte IV.
pub fn generate_iv() -> [u8; BLOCK_LEN] {
    let mut iv = [0u8; BLOCK_LEN];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// A negotiated cipher suite bound to its session key.
#[derive(Debug, Clone)]
pub struct SessionCipher {
    cipher: SymmetricCipherType,
    padding: SymmetricPaddingType,
    key: SessionKey,
}

impl SessionCipher {
    pub fn new(
        cipher: SymmetricCipherType,
        padding: SymmetricPaddingType,
        key: SessionKey,
    ) -> Result<Self> {
        if key.as_bytes().len() != cipher.key_len() {
            return Err(EcdhError::InvalidKeyLength {
                expected: cipher.key_len(),
                got: key.as_bytes().len(),
            });
        }
        Ok(Self {
            cipher,
            padding,
            key,
        })
    }

    pub fn cipher(&self) -> SymmetricCipherType {
        self.cipher
    }

    pub fn padding(&self) -> SymmetricPaddingType {
        self.padding
    }

    pub fn encrypt(&self, iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        encrypt(self.cipher, self.padding, self.key.as_bytes(), iv, plaintext)
    }

    pub fn decrypt(&self, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        decrypt(self.cipher, self.padding, self.key.as_bytes(), iv, ciphertext)
    }
}

fn check_iv(iv: &[u8]) -> Result<()> {
    if iv.len() != BLOCK_LEN {
        return Err(EcdhError::InvalidIv(iv.len()));
    }
    Ok(())
}

fn invalid_key(_: impl std::fmt::Debug) -> EcdhError {
    EcdhError::EncryptionError("invalid key length".into())
}

/// Encrypt with the given suite.
pub fn encrypt(
    cipher: SymmetricCipherType,
    padding: SymmetricPaddingType,
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    check_iv(iv)?;
    match cipher {
        SymmetricCipherType::Aes128Cbc => encrypt_with(
            cbc::Encryptor::<Aes128>::new_from_slices(key, iv).map_err(invalid_key)?,
            padding,
            plaintext,
        ),
        SymmetricCipherType::Aes256Cbc => encrypt_with(
            cbc::Encryptor::<Aes256>::new_from_slices(key, iv).map_err(invalid_key)?,
            padding,
            plaintext,
        ),
        SymmetricCipherType::Aes128Ecb => encrypt_with(
            ecb::Encryptor::<Aes128>::new_from_slice(key).map_err(invalid_key)?,
            padding,
            plaintext,
        ),
        SymmetricCipherType::Aes256Ecb => encrypt_with(
            ecb::Encryptor::<Aes256>::new_from_slice(key).map_err(invalid_key)?,
            padding,
            plaintext,
        ),
    }
}

/// Decrypt with the given suite.
pub fn decrypt(
    cipher: SymmetricCipherType,
    padding: SymmetricPaddingType,
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    check_iv(iv)?;
    let key_err = |_| EcdhError::DecryptionError("invalid key length".into());
    match cipher {
        SymmetricCipherType::Aes128Cbc => decrypt_with(
            cbc::Decryptor::<Aes128>::new_from_slices(key, iv).map_err(key_err)?,
            padding,
            ciphertext,
        ),
        SymmetricCipherType::Aes256Cbc => decrypt_with(
            cbc::Decryptor::<Aes256>::new_from_slices(key, iv).map_err(key_err)?,
            padding,
            ciphertext,
        ),
        SymmetricCipherType::Aes128Ecb => decrypt_with(
            ecb::Decryptor::<Aes128>::new_from_slice(key).map_err(key_err)?,
            padding,
            ciphertext,
        ),
        SymmetricCipherType::Aes256Ecb => decrypt_with(
            ecb::Decryptor::<Aes256>::new_from_slice(key).map_err(key_err)?,
            padding,
            ciphertext,
        ),
    }
}

fn encrypt_with<E: BlockEncryptMut>(
    encryptor: E,
    padding: SymmetricPaddingType,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    match padding {
        SymmetricPaddingType::Pkcs5 => Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
        SymmetricPaddingType::NoPad => {
            // NoPadding panics on a partial block
            if plaintext.len() % BLOCK_LEN != 0 {
                return Err(EcdhError::EncryptionError(format!(
                    "{} bytes is not a multiple of the block size",
                    plaintext.len()
                )));
            }
            Ok(encryptor.encrypt_padded_vec_mut::<NoPadding>(plaintext))
        }
    }
}

fn decrypt_with<D: BlockDecryptMut>(
    decryptor: D,
    padding: SymmetricPaddingType,
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let result = match padding {
        SymmetricPaddingType::Pkcs5 => decryptor.decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        SymmetricPaddingType::NoPad => decryptor.decrypt_padded_vec_mut::<NoPadding>(ciphertext),
    };
    result.map_err(|_| EcdhError::DecryptionError("bad padding or length".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key_for(cipher: SymmetricCipherType) -> Vec<u8> {
        (0..cipher.key_len() as u8).collect()
    }

    #[test]
    fn test_aes128_cbc_known_vector() {
        // NIST SP 800-38A F.2.1, first block
        let key = hex_bytes("2b7e151628aed2a6abf7158809cf4f3c");
        let iv = hex_bytes("000102030405060708090a0b0c0d0e0f");
        let pt = hex_bytes("6bc1bee22e409f96e93d7e117393172a");
        let ct = encrypt(
            SymmetricCipherType::Aes128Cbc,
            SymmetricPaddingType::NoPad,
            &key,
            &iv,
            &pt,
        )
        .unwrap();
        assert_eq!(ct, hex_bytes("7649abac8119b246cee98e9b12e9197d"));
    }

    fn hex_bytes(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn test_pkcs5_always_pads() {
        let cipher = SymmetricCipherType::Aes256Cbc;
        let ct = encrypt(
            cipher,
            SymmetricPaddingType::Pkcs5,
            &key_for(cipher),
            &[0u8; 16],
            &[7u8; 16],
        )
        .unwrap();
        assert_eq!(ct.len(), 32);
    }

    #[test]
    fn test_nopad_rejects_partial_block() {
        let cipher = SymmetricCipherType::Aes128Ecb;
        let result = encrypt(
            cipher,
            SymmetricPaddingType::NoPad,
            &key_for(cipher),
            &[0u8; 16],
            b"short",
        );
        assert!(matches!(result, Err(EcdhError::EncryptionError(_))));
    }

    #[test]
    fn test_bad_iv_and_key() {
        let cipher = SymmetricCipherType::Aes128Cbc;
        assert!(matches!(
            encrypt(cipher, SymmetricPaddingType::Pkcs5, &key_for(cipher), &[0u8; 8], b"x"),
            Err(EcdhError::InvalidIv(8))
        ));
        assert!(encrypt(cipher, SymmetricPaddingType::Pkcs5, &[0u8; 5], &[0u8; 16], b"x").is_err());
    }

    #[test]
    fn test_wrong_key_fails_or_garbles() {
        let cipher = SymmetricCipherType::Aes256Cbc;
        let iv = generate_iv();
        let ct = encrypt(cipher, SymmetricPaddingType::Pkcs5, &key_for(cipher), &iv, b"secret data").unwrap();
        let other = vec![0xffu8; 32];
        match decrypt(cipher, SymmetricPaddingType::Pkcs5, &other, &iv, &ct) {
            Ok(pt) => assert_ne!(pt, b"secret data"),
            Err(e) => assert!(matches!(e, EcdhError::DecryptionError(_))),
        }
    }

    proptest! {
        #[test]
        fn prop_round_trip_every_suite(
            data in proptest::collection::vec(any::<u8>(), 0..200),
            iv in any::<[u8; 16]>(),
        ) {
            for cipher in SymmetricCipherType::ALL {
                for padding in SymmetricPaddingType::ALL {
                    let plaintext = match padding {
                        SymmetricPaddingType::NoPad => &data[..data.len() - data.len() % BLOCK_LEN],
                        SymmetricPaddingType::Pkcs5 => &data[..],
                    };
                    let key = SessionKey::from_bytes(key_for(*cipher), *cipher).unwrap();
                    let session = SessionCipher::new(*cipher, *padding, key).unwrap();

                    let ct = session.encrypt(&iv, plaintext).unwrap();
                    prop_assert_eq!(ct.len() % BLOCK_LEN, 0);
                    let pt = session.decrypt(&iv, &ct).unwrap();
                    prop_assert_eq!(&pt[..], plaintext);
                }
            }
        }
    }
}
