// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! An implementation of the three-round DH-OPRF (Diffie-Hellman oblivious
//! pseudorandom function), run between a client holding the input and a
//! server holding the key. The client learns the PRF output; the server
//! learns nothing.

use crate::errors::InternalError;
use crate::group::{DhGroup, DH_GROUP, ELEMENT_LEN};
use hkdf::Hkdf;
use num_bigint_dig::BigUint;
use num_traits::Zero;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

// The expand stream of HKDF-SHA-256 is capped at 255 blocks, which bounds
// how many rejection-sampling draws hash_to_group can make. A single draw
// fails with probability below 2^-64, so the bound is never reached in
// practice.
const MAX_HASH_DRAWS: usize = 31;

/// Client-side OPRF state: the input and the blinding factor. Zeroized on
/// drop.
#[derive(Debug, Zeroize, ZeroizeOnDrop)]
pub(crate) struct Token {
    /// The client input, typically the password
    pub(crate) data: Vec<u8>,
    /// Random blinding factor in [1, p-1]
    pub(crate) blind: BigUint,
}

/// Hashes arbitrary bytes to a group element in Z*_p by rejection-sampling
/// uniform integers from an HKDF-SHA-256 stream seeded with the input.
pub(crate) fn hash_to_group(data: &[u8]) -> Result<BigUint, InternalError> {
    let hk = Hkdf::<Sha256>::new(None, data);
    for n in 1..=MAX_HASH_DRAWS {
        let mut okm = vec![0u8; n * ELEMENT_LEN];
        hk.expand(&[], &mut okm)
            .map_err(|_| InternalError::HkdfError)?;
        let candidate = BigUint::from_bytes_be(&okm[(n - 1) * ELEMENT_LEN..]);
        if !candidate.is_zero() && candidate < DH_GROUP.p {
            return Ok(candidate);
        }
    }
    Err(InternalError::HashToGroupError)
}

/// Computes the first step of DH-OPRF on the client: choose a random r in
/// [1, p-1] and form the blinded element a = H'(input) * g^r mod p. In the
/// negligibly likely event that a lands in a small subgroup, a fresh r is
/// drawn.
pub(crate) fn blind<R: RngCore + CryptoRng>(
    input: &[u8],
    rng: &mut R,
) -> Result<(Token, BigUint), InternalError> {
    let group: &DhGroup = &DH_GROUP;
    let h_prime = hash_to_group(input)?;
    loop {
        let r = group.sample_scalar(rng);
        let alpha = (&h_prime * group.public_key(&r)) % &group.p;
        if !group.is_in_small_subgroup(&alpha) {
            return Ok((
                Token {
                    data: input.to_vec(),
                    blind: r,
                },
                alpha,
            ));
        }
    }
}

/// Computes the second step of DH-OPRF on the server: given the blinded
/// element a and the per-user key k, respond with v = g^k and b = a^k.
///
/// The received value is checked to be a non-unit element of Z*_p before
/// use; an attacker-controlled element of a small subgroup would leak
/// information about k.
pub(crate) fn evaluate(
    alpha: &BigUint,
    oprf_key: &BigUint,
) -> Result<(BigUint, BigUint), InternalError> {
    let group: &DhGroup = &DH_GROUP;
    group.check_element(alpha, "a")?;
    let v = group.public_key(oprf_key);
    let beta = alpha.modpow(oprf_key, &group.p);
    Ok((v, beta))
}

/// Computes the third and final step of DH-OPRF on the client: unblind the
/// server response and produce the PRF output
/// H(input, encode(v), encode(b * (v^r)^-1)).
pub(crate) fn unblind(
    token: &Token,
    v: &BigUint,
    beta: &BigUint,
) -> Result<Zeroizing<[u8; 32]>, InternalError> {
    let group: &DhGroup = &DH_GROUP;
    group.check_element(v, "v")?;
    group.check_element(beta, "b")?;

    let v_r = v.modpow(&token.blind, &group.p);
    let mut z = (beta * group.invert(&v_r)) % &group.p;

    let mut h = Sha256::new();
    h.update(&token.data);
    h.update(group.encode(v));
    h.update(group.encode(&z));
    z.zeroize();
    Ok(Zeroizing::new(h.finalize().into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::One;
    use rand::rngs::OsRng;

    // Runs the full three-round protocol and returns the client output.
    fn run_oprf(input: &[u8], oprf_key: &BigUint) -> Zeroizing<[u8; 32]> {
        let mut rng = OsRng;
        let (token, alpha) = blind(input, &mut rng).unwrap();
        let (v, beta) = evaluate(&alpha, oprf_key).unwrap();
        unblind(&token, &v, &beta).unwrap()
    }

    #[test]
    fn output_is_independent_of_blinding() {
        let mut rng = OsRng;
        let key = DH_GROUP.sample_scalar(&mut rng);
        let first = run_oprf(b"hunter2", &key);
        let second = run_oprf(b"hunter2", &key);
        assert_eq!(*first, *second);
    }

    #[test]
    fn output_depends_on_input() {
        let mut rng = OsRng;
        let key = DH_GROUP.sample_scalar(&mut rng);
        assert_ne!(*run_oprf(b"hunter2", &key), *run_oprf(b"hunter3", &key));
    }

    #[test]
    fn output_depends_on_key() {
        let mut rng = OsRng;
        let key1 = DH_GROUP.sample_scalar(&mut rng);
        let key2 = DH_GROUP.sample_scalar(&mut rng);
        assert_ne!(*run_oprf(b"hunter2", &key1), *run_oprf(b"hunter2", &key2));
    }

    #[test]
    fn evaluate_rejects_bad_elements() {
        let mut rng = OsRng;
        let key = DH_GROUP.sample_scalar(&mut rng);
        let err = evaluate(&BigUint::zero(), &key).unwrap_err();
        assert_eq!(err.to_string(), "a is not in D-H group");
        let err = evaluate(&BigUint::one(), &key).unwrap_err();
        assert_eq!(err.to_string(), "a is in a small subgroup");
        let err = evaluate(&(&DH_GROUP.p - BigUint::one()), &key).unwrap_err();
        assert_eq!(err.to_string(), "a is in a small subgroup");
    }

    #[test]
    fn unblind_rejects_bad_elements() {
        let mut rng = OsRng;
        let key = DH_GROUP.sample_scalar(&mut rng);
        let (token, alpha) = blind(b"hunter2", &mut rng).unwrap();
        let (v, beta) = evaluate(&alpha, &key).unwrap();

        let err = unblind(&token, &DH_GROUP.p, &beta).unwrap_err();
        assert_eq!(err.to_string(), "v is not in D-H group");
        let err = unblind(&token, &v, &BigUint::one()).unwrap_err();
        assert_eq!(err.to_string(), "b is in a small subgroup");
    }

    #[test]
    fn hash_to_group_is_deterministic() {
        let first = hash_to_group(b"password").unwrap();
        let second = hash_to_group(b"password").unwrap();
        assert_eq!(first, second);
        assert!(DH_GROUP.is_in_group(&first));
        assert_ne!(first, hash_to_group(b"passwore").unwrap());
    }
}
