// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Diffie-Hellman operations over the multiplicative group Z*_p for the
//! 2048-bit MODP prime from RFC 3526

use crate::errors::InternalError;
use num_bigint_dig::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use once_cell::sync::Lazy;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

/// Length in bytes of the canonical encoding of a group element
pub(crate) const ELEMENT_LEN: usize = 256;

/// The 2048-bit MODP group from RFC 3526, with generator 2. The prime is
/// safe, so the only subgroups of Z*_p have one, two, or (p-1)/2 elements.
pub(crate) static DH_GROUP: Lazy<DhGroup> = Lazy::new(DhGroup::rfc3526_2048);

const RFC3526_2048_PRIME: &str = "\
    FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
    020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
    4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
    EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05\
    98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB\
    9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
    E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718\
    3995497CEA956AE515D2261898FA051015728E5A8AACAA68FFFFFFFFFFFFFFFF";

/// The group Z*_p together with a fixed generator
pub(crate) struct DhGroup {
    /// Group generator
    pub(crate) g: BigUint,
    /// Group modulus
    pub(crate) p: BigUint,
}

impl DhGroup {
    fn rfc3526_2048() -> Self {
        let p = BigUint::parse_bytes(RFC3526_2048_PRIME.as_bytes(), 16)
            .expect("RFC 3526 prime is a valid hex literal");
        Self {
            g: BigUint::from(2u32),
            p,
        }
    }

    /// The canonical encoding of a group element: big-endian, left-padded
    /// with zeros to [`ELEMENT_LEN`] bytes. This is the representation used
    /// whenever a group element enters a hash.
    pub(crate) fn encode(&self, x: &BigUint) -> Vec<u8> {
        let reduced = x % &self.p;
        let bytes = reduced.to_bytes_be();
        let mut out = vec![0u8; ELEMENT_LEN];
        out[ELEMENT_LEN - bytes.len()..].copy_from_slice(&bytes);
        out
    }

    /// Returns true if x is in the group Z*_p and false otherwise
    pub(crate) fn is_in_group(&self, x: &BigUint) -> bool {
        !x.is_zero() && x < &self.p
    }

    /// Returns true if x belongs to a small subgroup of Z*_p.
    ///
    /// Precondition: p is a safe prime. The subgroups containing one and two
    /// elements are considered to be small.
    pub(crate) fn is_in_small_subgroup(&self, x: &BigUint) -> bool {
        if x.is_one() {
            return true;
        }
        x.modpow(&BigUint::from(2u32), &self.p).is_one()
    }

    /// Checks that a received value is a usable group element, naming the
    /// value in the resulting error
    pub(crate) fn check_element(
        &self,
        x: &BigUint,
        name: &'static str,
    ) -> Result<(), InternalError> {
        if !self.is_in_group(x) {
            return Err(InternalError::NotInGroupError { name });
        }
        if self.is_in_small_subgroup(x) {
            return Err(InternalError::SmallSubgroupError { name });
        }
        Ok(())
    }

    /// Samples a uniformly random scalar in [1, p-1]
    pub(crate) fn sample_scalar<R: RngCore + CryptoRng>(&self, rng: &mut R) -> BigUint {
        loop {
            let key = rng.gen_biguint_below(&self.p);
            if !key.is_zero() {
                return key;
            }
        }
    }

    /// Computes the public key g^x mod p for a private key x
    pub(crate) fn public_key(&self, private_key: &BigUint) -> BigUint {
        self.g.modpow(private_key, &self.p)
    }

    /// Computes the shared secret SHA-256(encode(other_pub^priv mod p))
    pub(crate) fn shared_secret(
        &self,
        private_key: &BigUint,
        other_public_key: &BigUint,
    ) -> [u8; 32] {
        let s = other_public_key.modpow(private_key, &self.p);
        let mut h = Sha256::new();
        h.update(self.encode(&s));
        h.finalize().into()
    }

    /// Computes the multiplicative inverse of x via x^(p-2). Valid for any
    /// nonzero element since p is prime.
    pub(crate) fn invert(&self, x: &BigUint) -> BigUint {
        let exponent = &self.p - BigUint::from(2u32);
        x.modpow(&exponent, &self.p)
    }
}
