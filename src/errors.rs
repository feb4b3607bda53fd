// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! A list of error types which are produced during an execution of the protocol
use displaydoc::Display;
use thiserror::Error;

/// Represents an error in the manipulation of internal cryptographic data
#[derive(Debug, Display, Error)]
pub enum InternalError {
    /// {name} is not in D-H group
    NotInGroupError {
        /// name of the offending value
        name: &'static str,
    },
    /// {name} is in a small subgroup
    SmallSubgroupError {
        /// name of the offending value
        name: &'static str,
    },
    /// Authtag mismatch
    AuthtagMismatch,
    /// MAC mismatch
    MacMismatch,
    /// Got key length {actual_len}, expected {len}
    KeyLengthError {
        /// expected length
        len: usize,
        /// actual length
        actual_len: usize,
    },
    /// Invalid padding
    PaddingError,
    /// Computing HKDF failed while deriving subkeys
    HkdfError,
    /// Computing HMAC failed while supplying a secret key
    HmacError,
    /// Hashing to a group element failed
    HashToGroupError,
}

/// Represents an error in protocol handling
#[derive(Debug, Display, Error)]
pub enum ProtocolError {
    /// Internal error during password verification: {0}
    VerificationError(InternalError),
    /// RSA signature verification failed: {0}
    SignatureError(rsa::signature::Error),
    /// RSA key generation failed: {0}
    KeyGenerationError(rsa::Error),
    /// Decoding a PEM or DER structure failed: {0}
    DecodeError(rsa::pkcs1::Error),
    /// The envelope does not contain the expected PEM blocks
    InvalidEnvelopeStructureError,
    /// An RSA key size of {0} bits is below the supported minimum
    InvalidKeySizeError(usize),
    /// no such user: {0}
    UnknownUserError(String),
    /// Error with serializing / deserializing protocol messages
    SerializationError,
    /// I/O error: {0}
    IoError(std::io::Error),
}

// This is meant to express future(ly) non-trivial ways of converting the
// internal error into a ProtocolError
impl From<InternalError> for ProtocolError {
    fn from(e: InternalError) -> ProtocolError {
        ProtocolError::VerificationError(e)
    }
}

impl From<rsa::signature::Error> for ProtocolError {
    fn from(e: rsa::signature::Error) -> ProtocolError {
        ProtocolError::SignatureError(e)
    }
}

impl From<rsa::Error> for ProtocolError {
    fn from(e: rsa::Error) -> ProtocolError {
        ProtocolError::KeyGenerationError(e)
    }
}

impl From<rsa::pkcs1::Error> for ProtocolError {
    fn from(e: rsa::pkcs1::Error) -> ProtocolError {
        ProtocolError::DecodeError(e)
    }
}

impl From<std::io::Error> for ProtocolError {
    fn from(e: std::io::Error) -> ProtocolError {
        ProtocolError::IoError(e)
    }
}
