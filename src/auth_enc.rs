// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Authenticated encryption built from AES-128-CBC and HMAC-SHA-256 in
//! encrypt-then-MAC composition. The CBC and MAC keys are derived from a
//! single 16-byte input key with HKDF-SHA-256, and the output is laid out
//! as IV || ciphertext || authtag.

use crate::errors::InternalError;
use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use generic_array::GenericArray;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::{CryptoRng, RngCore};
use sha2::Sha256;
use zeroize::Zeroizing;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type HmacSha256 = Hmac<Sha256>;

/// Length of the input key
pub(crate) const KEY_LEN: usize = 16;

const BLOCK_SIZE: usize = 16;
const TAG_LEN: usize = 32;
const MIN_INPUT_LEN: usize = 3 * BLOCK_SIZE;

fn derive_keys(key: &[u8]) -> Result<(Zeroizing<[u8; 16]>, Zeroizing<[u8; 16]>), InternalError> {
    if key.len() != KEY_LEN {
        return Err(InternalError::KeyLengthError {
            len: KEY_LEN,
            actual_len: key.len(),
        });
    }
    let hk = Hkdf::<Sha256>::new(None, key);
    let mut okm = Zeroizing::new([0u8; 32]);
    hk.expand(&[], &mut *okm)
        .map_err(|_| InternalError::HkdfError)?;
    let mut cbc_key = Zeroizing::new([0u8; 16]);
    let mut hmac_key = Zeroizing::new([0u8; 16]);
    cbc_key.copy_from_slice(&okm[..16]);
    hmac_key.copy_from_slice(&okm[16..]);
    Ok((cbc_key, hmac_key))
}

// Pads the input to a multiple of the block size using the scheme from
// RFC 5652, section 6.3. At least one byte of padding is always added.
fn add_padding(input: &[u8]) -> Zeroizing<Vec<u8>> {
    let pad = BLOCK_SIZE - input.len() % BLOCK_SIZE;
    let mut out = Zeroizing::new(vec![pad as u8; input.len() + pad]);
    out[..input.len()].copy_from_slice(input);
    out
}

// Removes the padding added by add_padding. Only called after the authtag
// has been verified, so a malformed padding byte indicates a corrupt
// plaintext rather than an attack surface.
fn remove_padding(mut input: Zeroizing<Vec<u8>>) -> Result<Zeroizing<Vec<u8>>, InternalError> {
    let pad = match input.last() {
        Some(&b) => b as usize,
        None => return Err(InternalError::PaddingError),
    };
    if pad == 0 || pad > BLOCK_SIZE {
        return Err(InternalError::PaddingError);
    }
    let new_len = input.len() - pad;
    input.truncate(new_len);
    Ok(input)
}

/// Performs authenticated encryption of the plaintext under the provided
/// 16-byte key. A fresh IV is sampled for each call, so encrypting the same
/// plaintext twice yields distinct outputs.
pub(crate) fn auth_enc<R: RngCore + CryptoRng>(
    rng: &mut R,
    key: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, InternalError> {
    let (cbc_key, hmac_key) = derive_keys(key)?;

    let mut iv = [0u8; BLOCK_SIZE];
    rng.fill_bytes(&mut iv);

    let padded = add_padding(plaintext);
    let ciphertext = Aes128CbcEnc::new(
        GenericArray::from_slice(&*cbc_key),
        GenericArray::from_slice(&iv),
    )
    .encrypt_padded_vec_mut::<NoPadding>(&padded);

    let mut mac =
        HmacSha256::new_from_slice(&*hmac_key).map_err(|_| InternalError::HmacError)?;
    mac.update(&iv);
    mac.update(&ciphertext);
    let authtag = mac.finalize().into_bytes();

    let mut out = Vec::with_capacity(BLOCK_SIZE + ciphertext.len() + TAG_LEN);
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    out.extend_from_slice(&authtag);
    Ok(out)
}

/// Performs authenticated decryption of an output of [`auth_enc`]. The
/// authtag is checked with a constant-time comparison before any decryption
/// takes place; a mismatch signals a wrong key or a tampered input.
pub(crate) fn auth_dec(key: &[u8], input: &[u8]) -> Result<Zeroizing<Vec<u8>>, InternalError> {
    let (cbc_key, hmac_key) = derive_keys(key)?;

    if input.len() < MIN_INPUT_LEN || input.len() % BLOCK_SIZE != 0 {
        return Err(InternalError::AuthtagMismatch);
    }
    let iv = &input[..BLOCK_SIZE];
    let ciphertext = &input[BLOCK_SIZE..input.len() - TAG_LEN];
    let authtag = &input[input.len() - TAG_LEN..];

    let mut mac =
        HmacSha256::new_from_slice(&*hmac_key).map_err(|_| InternalError::HmacError)?;
    mac.update(iv);
    mac.update(ciphertext);
    if mac.verify_slice(authtag).is_err() {
        return Err(InternalError::AuthtagMismatch);
    }

    let plaintext = Aes128CbcDec::new(
        GenericArray::from_slice(&*cbc_key),
        GenericArray::from_slice(iv),
    )
    .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
    .map_err(|_| InternalError::PaddingError)?;
    remove_padding(Zeroizing::new(plaintext))
}
