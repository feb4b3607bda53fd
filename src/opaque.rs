// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Provides the main registration and login API
//!
//! Both protocols are three-message exchanges driven by linear session
//! types: each session is created by `start` and consumed by `finish`, so a
//! step cannot run twice or out of order. Client-side sessions hold secret
//! material and are zeroized on drop.

use crate::auth_enc;
use crate::envelope::Envelope;
use crate::errors::{InternalError, ProtocolError};
use crate::group::DH_GROUP;
use crate::messages::{
    CredentialFinalization, CredentialRequest, CredentialResponse, RegistrationRequest,
    RegistrationResponse, RegistrationUpload,
};
use crate::oprf;
use crate::serialization::{serialize, tokenize};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use num_bigint_dig::BigUint;
use rand::{CryptoRng, RngCore};
use rsa::pkcs1::{DecodeRsaPublicKey, EncodeRsaPublicKey, LineEnding};
use rsa::pss::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// The smallest client RSA key size accepted at registration. Key sizes
/// below this are trivially breakable; the 512-bit keys that appear in
/// older interop material are rejected.
pub const MIN_RSA_BITS: usize = 1024;

// Key exchange helpers
// ====================

// The value signed by both long-term keys: the canonical encodings of the
// client and server ephemeral public keys, in that order on both sides.
fn transcript(client_e_pk: &BigUint, server_e_pk: &BigUint) -> Vec<u8> {
    [DH_GROUP.encode(client_e_pk), DH_GROUP.encode(server_e_pk)].concat()
}

// Reads the session secret and the MAC key, 16 bytes each, from an
// HKDF-SHA-256 stream keyed with the ephemeral D-H output.
#[allow(clippy::type_complexity)]
fn dh_secrets(
    dh_shared: &[u8; 32],
) -> Result<(Zeroizing<[u8; 16]>, Zeroizing<[u8; 16]>), InternalError> {
    let hk = Hkdf::<Sha256>::new(None, dh_shared);
    let mut okm = Zeroizing::new([0u8; 32]);
    hk.expand(&[], &mut *okm)
        .map_err(|_| InternalError::HkdfError)?;
    let mut shared_secret = Zeroizing::new([0u8; 16]);
    let mut mac_key = Zeroizing::new([0u8; 16]);
    shared_secret.copy_from_slice(&okm[..16]);
    mac_key.copy_from_slice(&okm[16..]);
    Ok((shared_secret, mac_key))
}

// Each side MACs the PEM encoding of its own long-term public key, binding
// the long-term identities into the ephemeral exchange.
fn compute_dh_mac(key: &[u8], pk: &RsaPublicKey) -> Result<Vec<u8>, ProtocolError> {
    let pem = pk.to_pkcs1_pem(LineEnding::LF)?;
    let mut mac =
        Hmac::<Sha256>::new_from_slice(key).map_err(|_| InternalError::HmacError)?;
    mac.update(pem.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

fn verify_dh_mac(key: &[u8], pk: &RsaPublicKey, expected: &[u8]) -> Result<(), ProtocolError> {
    let pem = pk.to_pkcs1_pem(LineEnding::LF)?;
    let mut mac =
        Hmac::<Sha256>::new_from_slice(key).map_err(|_| InternalError::HmacError)?;
    mac.update(pem.as_bytes());
    mac.verify_slice(expected)
        .map_err(|_| InternalError::MacMismatch.into())
}

fn sign_transcript<R: RngCore + CryptoRng>(
    rng: &mut R,
    key: &RsaPrivateKey,
    transcript: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    let signing_key = SigningKey::<Sha256>::new(key.clone());
    let signature = signing_key.try_sign_with_rng(rng, transcript)?;
    Ok(signature.to_vec())
}

fn verify_transcript(
    pk: &RsaPublicKey,
    transcript: &[u8],
    signature: &[u8],
) -> Result<(), ProtocolError> {
    let verifying_key = VerifyingKey::<Sha256>::new(pk.clone());
    let signature = Signature::try_from(signature)?;
    Ok(verifying_key.verify(transcript, &signature)?)
}

// User records
// ============

/// The state that the server stores for each registered user, produced by
/// [`ServerRegistration::finish`]. The only secret-derived field is the
/// sealed envelope, which the server cannot open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    /// Name of this user
    pub username: String,
    /// The per-user OPRF key. This is the salt.
    pub(crate) oprf_key: BigUint,
    /// The OPRF public value v = g^oprf_key
    pub(crate) v: BigUint,
    /// The client's sealed envelope
    pub(crate) envelope: Vec<u8>,
    /// The client's long-term public key
    pub(crate) client_s_pk: RsaPublicKey,
}

impl UserRecord {
    /// Serialization into bytes, for storing the record at rest
    pub fn serialize(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok([
            serialize(self.username.as_bytes(), 2),
            serialize(&self.oprf_key.to_bytes_be(), 2),
            serialize(&self.v.to_bytes_be(), 2),
            serialize(&self.envelope, 2),
            serialize(self.client_s_pk.to_pkcs1_der()?.as_bytes(), 2),
        ]
        .concat())
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let (username_bytes, remainder) = tokenize(input, 2)?;
        let username =
            String::from_utf8(username_bytes).map_err(|_| ProtocolError::SerializationError)?;
        let (oprf_key_bytes, remainder) = tokenize(&remainder, 2)?;
        let (v_bytes, remainder) = tokenize(&remainder, 2)?;
        let (envelope, remainder) = tokenize(&remainder, 2)?;
        let (pk_bytes, remainder) = tokenize(&remainder, 2)?;
        if !remainder.is_empty() {
            return Err(ProtocolError::SerializationError);
        }
        Ok(Self {
            username,
            oprf_key: BigUint::from_bytes_be(&oprf_key_bytes),
            v: BigUint::from_bytes_be(&v_bytes),
            envelope,
            client_s_pk: RsaPublicKey::from_pkcs1_der(&pk_bytes)?,
        })
    }
}

// Registration
// ============

/// The state the client holds between the first and final registration
/// steps. Contains the password and the OPRF blinding factor; zeroized on
/// drop.
#[derive(Debug, Zeroize, ZeroizeOnDrop)]
pub struct ClientRegistration {
    token: oprf::Token,
    rsa_bits: usize,
}

/// Contains the fields that are returned by a client registration start
#[derive(Debug)]
pub struct ClientRegistrationStartResult {
    /// The registration request message to be sent to the server
    pub message: RegistrationRequest,
    /// The client state that must be persisted in order to complete
    /// registration
    pub state: ClientRegistration,
}

/// Contains the fields that are returned by a client registration finish
pub struct ClientRegistrationFinishResult {
    /// The registration upload message to be sent to the server
    pub message: RegistrationUpload,
}

impl ClientRegistration {
    /// Returns an initial blinded request to send to the server, as well as
    /// a [`ClientRegistration`].
    ///
    /// `rsa_bits` is the size of the long-term RSA key that will be
    /// generated for this user in [`ClientRegistration::finish`]; sizes
    /// below [`MIN_RSA_BITS`] are rejected. Registration must run over an
    /// authenticated channel.
    pub fn start<R: RngCore + CryptoRng>(
        rng: &mut R,
        username: &str,
        password: &[u8],
        rsa_bits: usize,
    ) -> Result<ClientRegistrationStartResult, ProtocolError> {
        if rsa_bits < MIN_RSA_BITS {
            return Err(ProtocolError::InvalidKeySizeError(rsa_bits));
        }
        let (token, alpha) = oprf::blind(password, rng)?;
        Ok(ClientRegistrationStartResult {
            message: RegistrationRequest {
                username: username.to_string(),
                alpha,
            },
            state: Self { token, rsa_bits },
        })
    }

    /// Unblinds the server's answer into the randomized password, generates
    /// the user's long-term RSA keypair, and seals the envelope. Returns the
    /// final registration message to be sent to the server.
    ///
    /// The session, the password, and the generated private key are erased
    /// from client memory when this call returns.
    pub fn finish<R: RngCore + CryptoRng>(
        self,
        rng: &mut R,
        response: RegistrationResponse,
    ) -> Result<ClientRegistrationFinishResult, ProtocolError> {
        let randomized_pwd = oprf::unblind(&self.token, &response.v, &response.beta)?;
        let client_private_key = RsaPrivateKey::new(rng, self.rsa_bits)?;
        let client_s_pk = client_private_key.to_public_key();
        let envelope = Envelope {
            client_private_key,
            server_public_key: response.server_s_pk,
        };
        let sealed = envelope.seal(rng, &randomized_pwd[..auth_enc::KEY_LEN])?;
        Ok(ClientRegistrationFinishResult {
            message: RegistrationUpload {
                envelope: sealed,
                client_s_pk,
            },
        })
    }
}

/// The state the server holds between the first and final registration
/// steps
pub struct ServerRegistration {
    username: String,
    oprf_key: BigUint,
    v: BigUint,
}

/// Contains the fields that are returned by a server registration start
pub struct ServerRegistrationStartResult {
    /// The registration response message to send to the client
    pub message: RegistrationResponse,
    /// The server state that must be persisted in order to complete
    /// registration
    pub state: ServerRegistration,
}

impl ServerRegistration {
    /// From the client's blinded password, samples a fresh per-user OPRF
    /// key and returns a response to be sent back to the client, as well as
    /// a [`ServerRegistration`].
    ///
    /// `server_s_pk` is the public half of the server's long-term keypair;
    /// the same keypair can be shared across users.
    pub fn start<R: RngCore + CryptoRng>(
        rng: &mut R,
        server_s_pk: &RsaPublicKey,
        request: RegistrationRequest,
    ) -> Result<ServerRegistrationStartResult, ProtocolError> {
        let oprf_key = DH_GROUP.sample_scalar(rng);
        let (v, beta) = oprf::evaluate(&request.alpha, &oprf_key)?;
        Ok(ServerRegistrationStartResult {
            message: RegistrationResponse {
                v: v.clone(),
                beta,
                server_s_pk: server_s_pk.clone(),
            },
            state: Self {
                username: request.username,
                oprf_key,
                v,
            },
        })
    }

    /// From the client's sealed envelope and public key, produces the
    /// record the server should store for this user. No record exists until
    /// this step completes.
    pub fn finish(self, upload: RegistrationUpload) -> UserRecord {
        UserRecord {
            username: self.username,
            oprf_key: self.oprf_key,
            v: self.v,
            envelope: upload.envelope,
            client_s_pk: upload.client_s_pk,
        }
    }
}

// Login
// =====

/// The state the client holds between the first and final login steps.
/// Contains the password, the OPRF blinding factor, and the ephemeral D-H
/// private key; zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClientLogin {
    token: oprf::Token,
    eph_private: BigUint,
    eph_public: BigUint,
}

/// Contains the fields that are returned by a client login start
pub struct ClientLoginStartResult {
    /// The credential request message to be sent to the server
    pub message: CredentialRequest,
    /// The client state that must be persisted in order to complete login
    pub state: ClientLogin,
}

/// Contains the fields that are returned by a client login finish
#[derive(Debug)]
pub struct ClientLoginFinishResult {
    /// The credential finalization message to be sent to the server
    pub message: CredentialFinalization,
    /// The 16-byte secret shared with the server upon a successful login
    pub shared_secret: Vec<u8>,
}

impl ClientLogin {
    /// Blinds the password and samples an ephemeral D-H keypair, returning
    /// the credential request to send to the server as well as a
    /// [`ClientLogin`]
    pub fn start<R: RngCore + CryptoRng>(
        rng: &mut R,
        username: &str,
        password: &[u8],
    ) -> Result<ClientLoginStartResult, ProtocolError> {
        let (token, alpha) = oprf::blind(password, rng)?;
        let eph_private = DH_GROUP.sample_scalar(rng);
        let eph_public = DH_GROUP.public_key(&eph_private);
        Ok(ClientLoginStartResult {
            message: CredentialRequest {
                username: username.to_string(),
                alpha,
                client_e_pk: eph_public.clone(),
            },
            state: Self {
                token,
                eph_private,
                eph_public,
            },
        })
    }

    /// Recovers the randomized password, opens the envelope, and verifies
    /// the server's signature and MAC. On success the client has
    /// authenticated the server; the returned message completes the
    /// client's proof towards the server.
    ///
    /// An authtag mismatch signals a wrong password or a tampered envelope.
    pub fn finish<R: RngCore + CryptoRng>(
        self,
        rng: &mut R,
        response: CredentialResponse,
    ) -> Result<ClientLoginFinishResult, ProtocolError> {
        let randomized_pwd = oprf::unblind(&self.token, &response.v, &response.beta)?;
        let envelope = Envelope::open(&randomized_pwd[..auth_enc::KEY_LEN], &response.envelope)?;

        let transcript = transcript(&self.eph_public, &response.server_e_pk);
        verify_transcript(&envelope.server_public_key, &transcript, &response.signature)?;

        DH_GROUP.check_element(&response.server_e_pk, "Y")?;
        let dh_shared =
            Zeroizing::new(DH_GROUP.shared_secret(&self.eph_private, &response.server_e_pk));
        let (shared_secret, mac_key) = dh_secrets(&dh_shared)?;
        verify_dh_mac(&*mac_key, &envelope.server_public_key, &response.mac)?;

        let signature = sign_transcript(rng, &envelope.client_private_key, &transcript)?;
        let mac = compute_dh_mac(&*mac_key, &envelope.client_private_key.to_public_key())?;
        Ok(ClientLoginFinishResult {
            message: CredentialFinalization { signature, mac },
            shared_secret: shared_secret.to_vec(),
        })
    }
}

/// The state the server holds between the first and final login steps.
/// The derived keys are zeroized on drop.
#[derive(Debug, Zeroize, ZeroizeOnDrop)]
pub struct ServerLogin {
    transcript: Vec<u8>,
    shared_secret: [u8; 16],
    mac_key: [u8; 16],
    #[zeroize(skip)]
    client_s_pk: RsaPublicKey,
}

/// Contains the fields that are returned by a server login start
#[derive(Debug)]
pub struct ServerLoginStartResult {
    /// The credential response message to send to the client
    pub message: CredentialResponse,
    /// The server state that must be persisted in order to complete login
    pub state: ServerLogin,
}

/// Contains the fields that are returned by a server login finish
#[derive(Debug)]
pub struct ServerLoginFinishResult {
    /// The 16-byte secret shared with the client upon a successful login
    pub shared_secret: Vec<u8>,
}

impl ServerLogin {
    /// Evaluates the OPRF against the user's stored key, runs the server
    /// side of the ephemeral D-H exchange, and signs the exchange with the
    /// server's long-term key. Returns the credential response to send to
    /// the client, as well as a [`ServerLogin`].
    ///
    /// The caller looks the record up by the username in the credential
    /// request; see [`UserStore`](crate::UserStore).
    pub fn start<R: RngCore + CryptoRng>(
        rng: &mut R,
        server_signing_key: &RsaPrivateKey,
        record: &UserRecord,
        request: CredentialRequest,
    ) -> Result<ServerLoginStartResult, ProtocolError> {
        let (v, beta) = oprf::evaluate(&request.alpha, &record.oprf_key)?;
        DH_GROUP.check_element(&request.client_e_pk, "X")?;

        let eph_private = Zeroizing::new(DH_GROUP.sample_scalar(rng));
        let server_e_pk = DH_GROUP.public_key(&eph_private);

        let transcript = transcript(&request.client_e_pk, &server_e_pk);
        let signature = sign_transcript(rng, server_signing_key, &transcript)?;

        let dh_shared =
            Zeroizing::new(DH_GROUP.shared_secret(&eph_private, &request.client_e_pk));
        let (shared_secret, mac_key) = dh_secrets(&dh_shared)?;
        let mac = compute_dh_mac(&*mac_key, &server_signing_key.to_public_key())?;

        Ok(ServerLoginStartResult {
            message: CredentialResponse {
                v,
                beta,
                envelope: record.envelope.clone(),
                server_e_pk,
                signature,
                mac,
            },
            state: ServerLogin {
                transcript,
                shared_secret: *shared_secret,
                mac_key: *mac_key,
                client_s_pk: record.client_s_pk.clone(),
            },
        })
    }

    /// Verifies the client's signature and MAC against the registered
    /// long-term public key. On success the server has authenticated the
    /// client and the returned secret equals the client's.
    pub fn finish(
        self,
        finalization: CredentialFinalization,
    ) -> Result<ServerLoginFinishResult, ProtocolError> {
        verify_transcript(&self.client_s_pk, &self.transcript, &finalization.signature)?;
        verify_dh_mac(&self.mac_key, &self.client_s_pk, &finalization.mac)?;
        Ok(ServerLoginFinishResult {
            shared_secret: self.shared_secret.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn dh_secrets_are_distinct() {
        let mut rng = OsRng;
        let x = DH_GROUP.sample_scalar(&mut rng);
        let public = DH_GROUP.public_key(&x);
        let dh_shared = DH_GROUP.shared_secret(&x, &public);
        let (shared_secret, mac_key) = dh_secrets(&dh_shared).unwrap();
        assert_eq!(shared_secret.len(), 16);
        assert_eq!(mac_key.len(), 16);
        assert_ne!(*shared_secret, *mac_key);
    }

    #[test]
    fn registration_rejects_small_keys() {
        let mut rng = OsRng;
        let result = ClientRegistration::start(&mut rng, "user", b"password", 512);
        assert!(matches!(
            result.unwrap_err(),
            ProtocolError::InvalidKeySizeError(512)
        ));
    }

    #[test]
    fn transcript_is_order_sensitive() {
        let mut rng = OsRng;
        let x = DH_GROUP.sample_scalar(&mut rng);
        let y = DH_GROUP.sample_scalar(&mut rng);
        assert_ne!(transcript(&x, &y), transcript(&y, &x));
        assert_eq!(transcript(&x, &y).len(), 512);
    }
}
