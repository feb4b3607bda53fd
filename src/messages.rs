// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Contains the messages used for the registration and login protocols.
//!
//! Each message carries its fields in a fixed order, length-prefixed with
//! two big-endian bytes. Group elements travel as minimal big-endian
//! integers; they are re-encoded in fixed-width form only when they enter a
//! hash. RSA public keys travel as PKCS#1 DER. Deserialization performs no
//! group-membership checks; received elements are validated at the point of
//! use.

use crate::errors::ProtocolError;
use crate::serialization::{serialize, tokenize};
use num_bigint_dig::BigUint;
use rsa::pkcs1::{DecodeRsaPublicKey, EncodeRsaPublicKey};
use rsa::RsaPublicKey;

fn serialize_public_key(pk: &RsaPublicKey) -> Result<Vec<u8>, ProtocolError> {
    Ok(pk.to_pkcs1_der()?.as_bytes().to_vec())
}

fn tokenize_string(input: &[u8]) -> Result<(String, Vec<u8>), ProtocolError> {
    let (bytes, remainder) = tokenize(input, 2)?;
    let s = String::from_utf8(bytes).map_err(|_| ProtocolError::SerializationError)?;
    Ok((s, remainder))
}

fn ensure_empty(remainder: &[u8]) -> Result<(), ProtocolError> {
    if remainder.is_empty() {
        Ok(())
    } else {
        Err(ProtocolError::SerializationError)
    }
}

/// The message sent by the client to the server, to initiate registration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationRequest {
    /// The name the client registers under
    pub(crate) username: String,
    /// The blinded password element a = H'(password) * g^r
    pub(crate) alpha: BigUint,
}

impl RegistrationRequest {
    /// The name the client registers under
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        [
            serialize(self.username.as_bytes(), 2),
            serialize(&self.alpha.to_bytes_be(), 2),
        ]
        .concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let (username, remainder) = tokenize_string(input)?;
        let (alpha_bytes, remainder) = tokenize(&remainder, 2)?;
        ensure_empty(&remainder)?;
        Ok(Self {
            username,
            alpha: BigUint::from_bytes_be(&alpha_bytes),
        })
    }
}

/// The answer sent by the server to the client, upon reception of the
/// registration attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationResponse {
    /// The per-user OPRF public value v = g^k
    pub(crate) v: BigUint,
    /// The evaluated blinded element b = a^k
    pub(crate) beta: BigUint,
    /// The server's long-term public key
    pub(crate) server_s_pk: RsaPublicKey,
}

impl RegistrationResponse {
    /// Serialization into bytes
    pub fn serialize(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok([
            serialize(&self.v.to_bytes_be(), 2),
            serialize(&self.beta.to_bytes_be(), 2),
            serialize(&serialize_public_key(&self.server_s_pk)?, 2),
        ]
        .concat())
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let (v_bytes, remainder) = tokenize(input, 2)?;
        let (beta_bytes, remainder) = tokenize(&remainder, 2)?;
        let (pk_bytes, remainder) = tokenize(&remainder, 2)?;
        ensure_empty(&remainder)?;
        Ok(Self {
            v: BigUint::from_bytes_be(&v_bytes),
            beta: BigUint::from_bytes_be(&beta_bytes),
            server_s_pk: RsaPublicKey::from_pkcs1_der(&pk_bytes)?,
        })
    }
}

/// The final message of registration, sent by the client to the server,
/// containing the sealed envelope and the client's public key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationUpload {
    /// The sealed envelope, stored server-side and opaque to the server
    pub(crate) envelope: Vec<u8>,
    /// The client's long-term public key
    pub(crate) client_s_pk: RsaPublicKey,
}

impl RegistrationUpload {
    /// Serialization into bytes
    pub fn serialize(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok([
            serialize(&self.envelope, 2),
            serialize(&serialize_public_key(&self.client_s_pk)?, 2),
        ]
        .concat())
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let (envelope, remainder) = tokenize(input, 2)?;
        let (pk_bytes, remainder) = tokenize(&remainder, 2)?;
        ensure_empty(&remainder)?;
        Ok(Self {
            envelope,
            client_s_pk: RsaPublicKey::from_pkcs1_der(&pk_bytes)?,
        })
    }
}

/// The message sent by the client to the server, to initiate a login
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialRequest {
    /// The name the client claims to be registered under
    pub(crate) username: String,
    /// The blinded password element a = H'(password) * g^r
    pub(crate) alpha: BigUint,
    /// The client's ephemeral public key g^x
    pub(crate) client_e_pk: BigUint,
}

impl CredentialRequest {
    /// The name the client claims to be registered under, used by the
    /// server to look up the corresponding record
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        [
            serialize(self.username.as_bytes(), 2),
            serialize(&self.alpha.to_bytes_be(), 2),
            serialize(&self.client_e_pk.to_bytes_be(), 2),
        ]
        .concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let (username, remainder) = tokenize_string(input)?;
        let (alpha_bytes, remainder) = tokenize(&remainder, 2)?;
        let (client_e_pk_bytes, remainder) = tokenize(&remainder, 2)?;
        ensure_empty(&remainder)?;
        Ok(Self {
            username,
            alpha: BigUint::from_bytes_be(&alpha_bytes),
            client_e_pk: BigUint::from_bytes_be(&client_e_pk_bytes),
        })
    }
}

/// The answer sent by the server to the client, upon reception of the login
/// attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialResponse {
    /// The per-user OPRF public value v = g^k
    pub(crate) v: BigUint,
    /// The evaluated blinded element b = a^k
    pub(crate) beta: BigUint,
    /// The user's sealed envelope
    pub(crate) envelope: Vec<u8>,
    /// The server's ephemeral public key g^y
    pub(crate) server_e_pk: BigUint,
    /// RSASSA-PSS signature over the ephemeral public keys, under the
    /// server's long-term key
    pub(crate) signature: Vec<u8>,
    /// HMAC-SHA-256 over the server's long-term public key, under the MAC
    /// key derived from the ephemeral exchange
    pub(crate) mac: Vec<u8>,
}

impl CredentialResponse {
    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        [
            serialize(&self.v.to_bytes_be(), 2),
            serialize(&self.beta.to_bytes_be(), 2),
            serialize(&self.envelope, 2),
            serialize(&self.server_e_pk.to_bytes_be(), 2),
            serialize(&self.signature, 2),
            serialize(&self.mac, 2),
        ]
        .concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let (v_bytes, remainder) = tokenize(input, 2)?;
        let (beta_bytes, remainder) = tokenize(&remainder, 2)?;
        let (envelope, remainder) = tokenize(&remainder, 2)?;
        let (server_e_pk_bytes, remainder) = tokenize(&remainder, 2)?;
        let (signature, remainder) = tokenize(&remainder, 2)?;
        let (mac, remainder) = tokenize(&remainder, 2)?;
        ensure_empty(&remainder)?;
        Ok(Self {
            v: BigUint::from_bytes_be(&v_bytes),
            beta: BigUint::from_bytes_be(&beta_bytes),
            envelope,
            server_e_pk: BigUint::from_bytes_be(&server_e_pk_bytes),
            signature,
            mac,
        })
    }
}

/// The final message of a login, sent by the client to the server
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialFinalization {
    /// RSASSA-PSS signature over the ephemeral public keys, under the
    /// client's long-term key
    pub(crate) signature: Vec<u8>,
    /// HMAC-SHA-256 over the client's long-term public key, under the MAC
    /// key derived from the ephemeral exchange
    pub(crate) mac: Vec<u8>,
}

impl CredentialFinalization {
    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        [serialize(&self.signature, 2), serialize(&self.mac, 2)].concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let (signature, remainder) = tokenize(input, 2)?;
        let (mac, remainder) = tokenize(&remainder, 2)?;
        ensure_empty(&remainder)?;
        Ok(Self { signature, mac })
    }
}
